use super::super::parse;

fn dump(src: &str) -> String {
  let module = parse(src, "test").expect("parse failed");
  module.dump()
}

fn errors(src: &str) -> Vec<String> {
  parse(src, "test")
    .err()
    .expect("parse unexpectedly succeeded")
    .into_iter()
    .map(|e| e.message)
    .collect()
}

#[test]
fn precedence_of_terms_and_factors() {
  let out = dump("1 + 2 * 3");
  assert_eq!(
    out,
    "BLOCK (1) [] []\n\
     \x20 BINARY (+)\n\
     \x20   LITERAL 1\n\
     \x20   BINARY (*)\n\
     \x20     LITERAL 2\n\
     \x20     LITERAL 3\n"
  );
}

#[test]
fn power_is_right_associative() {
  let out = dump("2 ** 3 ** 2");
  // 2 ** (3 ** 2)
  let plain: Vec<_> = out.lines().map(str::trim).collect();
  assert_eq!(
    plain,
    vec![
      "BLOCK (1) [] []",
      "BINARY (**)",
      "LITERAL 2",
      "BINARY (**)",
      "LITERAL 3",
      "LITERAL 2",
    ]
  );
}

#[test]
fn parenthesized_power_binds_left() {
  let out = dump("(2 ** 3) ** 2");
  let plain: Vec<_> = out.lines().map(str::trim).collect();
  assert_eq!(
    plain,
    vec![
      "BLOCK (1) [] []",
      "BINARY (**)",
      "BINARY (**)",
      "LITERAL 2",
      "LITERAL 3",
      "LITERAL 2",
    ]
  );
}

#[test]
fn comparison_chains_are_left_associative() {
  let out = dump("1 < 2 == true");
  let plain: Vec<_> = out.lines().map(str::trim).collect();
  assert_eq!(
    plain,
    vec![
      "BLOCK (1) [] []",
      "BINARY (==)",
      "BINARY (<)",
      "LITERAL 1",
      "LITERAL 2",
      "LITERAL true",
    ]
  );
}

#[test]
fn ternary_parses_to_a_branch() {
  let out = dump("var x = true ? 1 : 2");
  assert!(out.contains("VAR_DECL x"));
  assert!(out.contains("BRANCH"));
}

#[test]
fn arrow_function_desugars_to_return() {
  let out = dump("var f = fn(x) => x + 1");
  assert!(out.contains("FUNCTION (x)"));
  assert!(out.contains("RETURN"));
  assert!(out.contains("BINARY (+)"));
}

#[test]
fn named_function_declares_a_variable() {
  let out = dump("fn main() { return 1 }");
  assert!(out.contains("VAR_DECL main"));
  assert!(out.contains("FUNCTION ()"));
}

#[test]
fn upvalues_resolve_through_two_levels() {
  let module = parse("var make = fn(x) => fn(y) => x + y", "test").expect("parse failed");
  let out = module.dump();
  // the inner function captures `x`, transitively through the outer one
  assert!(out.contains("BLOCK (1) [y] [x]"), "dump:\n{out}");
  assert!(out.contains("BLOCK (1) [x] []"), "dump:\n{out}");
}

#[test]
fn blocks_inside_a_function_do_not_capture() {
  let module = parse("fn f() { var a = 1 if true { return a } }", "test").expect("parse failed");
  let out = module.dump();
  // the if-block sees `a` as the enclosing frame's local, not an upvalue
  assert!(out.contains("BLOCK (1) [] []"), "dump:\n{out}");
}

#[test]
fn redeclared_local_is_an_error() {
  let errors = errors("var a = 1 var a = 2");
  assert!(errors[0].contains("variable 'a' already declared"));
  assert!(errors[0].starts_with("parse error in test at "));
}

#[test]
fn duplicate_parameter_is_an_error() {
  let errors = errors("var f = fn(a, a) => a");
  assert!(errors[0].contains("duplicate parameter 'a'"));
}

#[test]
fn missing_initializer_is_an_error() {
  let errors = errors("var a");
  assert!(errors[0].contains("variable must be initialized"));
}

#[test]
fn missing_brace_is_an_error() {
  let errors = errors("if true { return 1");
  assert!(errors.iter().any(|e| e.contains("expected '}'")));
}

#[test]
fn assignment_to_undeclared_variable_is_an_error() {
  let errors = errors("undef = 1");
  assert!(errors[0].contains("cannot assign to undefined variable 'undef'"));
}

#[test]
fn assignment_requires_an_identifier_target() {
  let errors = errors("var a = 1 1 = a");
  assert!(errors[0].contains("invalid assignment target"));
}

#[test]
fn assignment_is_right_associative() {
  let out = dump("var a = 1 var b = 2 a = b = 3");
  let plain: Vec<_> = out.lines().map(str::trim).collect();
  let i = plain.iter().position(|l| *l == "BINARY (=)").unwrap();
  assert_eq!(plain[i + 1], "IDENTIFIER a");
  assert_eq!(plain[i + 2], "BINARY (=)");
}

#[test]
fn lex_errors_fail_the_parse() {
  let errors = errors("var a = @");
  assert!(errors.iter().any(|e| e.contains("unknown character")));
}

#[test]
fn unary_operators_parse_in_prefix_position() {
  let out = dump("var a = true !a");
  assert!(out.contains("UNARY (!)"));
  let out = dump("var n = 1 var m = -n");
  assert!(out.contains("UNARY (-)"));
  let out = dump("var n = 1 var m = ~n");
  assert!(out.contains("UNARY (~)"));
}
