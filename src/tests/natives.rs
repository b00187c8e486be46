use super::common::load;
use crate::value::Value;
use indoc::indoc;

#[test]
fn argv_methods_dispatch_through_the_array_class() {
  let mut script = load("fn main(argv) { return argv.at(0) }");

  let hello = script.vm.new_string("hello");
  let mut argv = script.vm.new_array();
  argv.values.push(Value::object(hello));

  let result = script.run(&[Value::object(argv)]);
  assert_eq!(result.to_str().unwrap().as_str(), "hello");
}

#[test]
fn range_builds_an_array() {
  let mut script = load(indoc! {"
    fn main() {
      var xs = range(0, 4)
      return xs.at(3)
    }
  "});
  assert_eq!(script.run(&[]).to_number(), Some(3.0));
}

#[test]
fn range_accepts_a_step() {
  let mut script = load(indoc! {"
    fn main() {
      var xs = range(0, 10, 3)
      return xs.at(2)
    }
  "});
  assert_eq!(script.run(&[]).to_number(), Some(6.0));
}

#[test]
fn each_calls_back_into_the_interpreter() {
  let mut script = load(indoc! {"
    fn main() {
      var xs = range(0, 4)
      var s = 0
      xs.each(fn(x) => s = s + x)
      return s
    }
  "});
  // 0 + 1 + 2 + 3, accumulated through the captured cell
  assert_eq!(script.run(&[]).to_number(), Some(6.0));
}

#[test]
fn out_of_range_at_is_null() {
  let mut script = load(indoc! {"
    fn main() {
      var xs = range(0, 2)
      return xs.at(10)
    }
  "});
  assert!(script.run(&[]).is_null());
}

#[test]
fn table_methods_round_trip() {
  let mut script = load(indoc! {"
    fn main() {
      t.set(1, 2)
      return t.get(1)
    }
  "});
  let table = script.vm.new_table();
  script.vm.set_global("t", Value::object(table));
  assert_eq!(script.run(&[]).to_number(), Some(2.0));
}

#[test]
fn env_table_reaches_main() {
  let mut script = load("fn main(argv, env) { return env.get(\"LANG\") }");

  let argv = script.vm.new_array();
  let mut env = script.vm.new_table();
  let key = script.vm.new_string("LANG");
  let value = script.vm.new_string("C.UTF-8");
  env.set(Value::object(key), Value::object(value));

  let result = script.run(&[Value::object(argv), Value::object(env)]);
  assert_eq!(result.to_str().unwrap().as_str(), "C.UTF-8");
}

#[test]
fn println_formats_placeholders() {
  let mut script = load(indoc! {r#"
    fn main() {
      println("{} + {} = {}", 1, 2, 1 + 2)
      return 0
    }
  "#});
  assert_eq!(script.run(&[]).to_number(), Some(0.0));
}
