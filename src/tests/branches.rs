use super::common::load;
use indoc::indoc;

#[test]
fn taken_branch_returns_big() {
  let mut script = load(indoc! {r#"
    fn main() {
      var a = 10
      if a > 5 { return "big" } else { return "small" }
    }
  "#});
  let result = script.run(&[]);
  assert_eq!(result.to_str().unwrap().as_str(), "big");
}

#[test]
fn untaken_branch_returns_small() {
  let mut script = load(indoc! {r#"
    fn main() {
      var a = 3
      if a > 5 { return "big" } else { return "small" }
    }
  "#});
  let result = script.run(&[]);
  assert_eq!(result.to_str().unwrap().as_str(), "small");
}

#[test]
fn if_without_else_falls_through() {
  let mut script = load(indoc! {"
    fn main() {
      if false { return 1 }
      return 2
    }
  "});
  assert_eq!(script.run(&[]).to_number(), Some(2.0));

  let mut script = load(indoc! {"
    fn main() {
      if true { return 1 }
      return 2
    }
  "});
  assert_eq!(script.run(&[]).to_number(), Some(1.0));
}

#[test]
fn ternary_selects_by_condition() {
  let mut script = load("fn main() { return 1 < 2 ? \"yes\" : \"no\" }");
  assert_eq!(script.run(&[]).to_str().unwrap().as_str(), "yes");

  let mut script = load("fn main() { return 1 > 2 ? \"yes\" : \"no\" }");
  assert_eq!(script.run(&[]).to_str().unwrap().as_str(), "no");
}

#[test]
fn ternary_is_right_associative() {
  let mut script = load("fn main() { return false ? 1 : false ? 2 : 3 }");
  assert_eq!(script.run(&[]).to_number(), Some(3.0));
}
