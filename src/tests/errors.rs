use super::common::{compile_errors, load};
use indoc::indoc;

#[test]
fn undefined_global_reports_and_unwinds() {
  let mut script = load("fn main() { return undef + 1 }");
  let errors = script.run_expecting_errors(&[]);
  assert_eq!(errors, vec!["runtime error: undefined variable 'undef'"]);
}

#[test]
fn calling_a_number_is_an_error() {
  let mut script = load("fn main() { var x = 1 return x() }");
  let errors = script.run_expecting_errors(&[]);
  assert_eq!(errors, vec!["runtime error: value is not callable"]);
}

#[test]
fn missing_arguments_are_an_error() {
  let mut script = load(indoc! {"
    fn main() {
      var f = fn(a, b) => a
      return f(1)
    }
  "});
  let errors = script.run_expecting_errors(&[]);
  assert_eq!(
    errors,
    vec!["runtime error: not enough arguments to run function, got 1 instead of 2"]
  );
}

#[test]
fn arithmetic_requires_numbers() {
  let mut script = load("fn main() { return 1 + \"a\" }");
  let errors = script.run_expecting_errors(&[]);
  assert_eq!(errors, vec!["runtime error: operand of ADD is not a Number"]);
}

#[test]
fn connectives_require_booleans() {
  let mut script = load("fn main() { return 1 && true }");
  let errors = script.run_expecting_errors(&[]);
  assert_eq!(errors, vec!["runtime error: operand of AND is not a Bool"]);
}

#[test]
fn conditions_require_booleans() {
  let mut script = load("fn main() { if 1 { return 2 } }");
  let errors = script.run_expecting_errors(&[]);
  assert_eq!(
    errors,
    vec!["runtime error: condition did not result in a boolean"]
  );
}

#[test]
fn undefined_property_names_the_class() {
  let mut script = load("fn main() { var n = 1 return n.frobnicate }");
  let errors = script.run_expecting_errors(&[]);
  assert_eq!(
    errors,
    vec!["runtime error: undefined property 'frobnicate' on value of type 'Number'"]
  );
}

#[test]
fn null_has_no_properties() {
  let mut script = load("fn main() { var n = null return n.x }");
  let errors = script.run_expecting_errors(&[]);
  assert_eq!(errors, vec!["runtime error: 'null' has no properties"]);
}

#[test]
fn compile_failure_returns_null_and_reports() {
  let errors = compile_errors("var a = ");
  assert!(errors[0].contains("expected expression"));

  let errors = compile_errors("var a = 1 var a = 2");
  assert!(errors[0].contains("already declared"));
}

#[test]
fn the_vm_survives_a_runtime_error() {
  let mut script = load("fn main() { return undef }");
  script.run_expecting_errors(&[]);

  // the stack is left as-is; resetting it makes the VM reusable
  script.vm.reset_stack();
  script.errors.borrow_mut().clear();
  let entry = script.vm.compile("fn main() { return 1 }", "again");
  script.vm.interpret(entry, 0);
  let main = script.vm.pop();
  script.vm.reset_stack();
  script.vm.call(main, &[]);
  assert_eq!(script.vm.pop().to_number(), Some(1.0));
}
