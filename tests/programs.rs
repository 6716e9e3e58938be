#![expect(clippy::unwrap_used)] // test code OK

use lispreter::driver::{eval_str, on_eval_stack, run};
use lispreter::evaluator::Environment;
use lispreter::reader::parse_node;
use lispreter::{Error, ErrorKind};

fn run_program(source: &str) -> Result<String, Error> {
    let mut env = Environment::new();
    let mut out = Vec::new();
    run(source, &mut env, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn test_recursive_list_functions() {
    let output = run_program(
        r"
        ; reverse a list with an accumulator
        (DEFUN REV2 (L ACC) (COND ((NULL L) ACC) (T (REV2 (CDR L) (CONS (CAR L) ACC)))))
        (DEFUN REVERSE (L) (REV2 L NIL))
        (REVERSE '(1 2 3 4))
        (REVERSE NIL)

        (DEFUN MEMBER (X L) (COND ((NULL L) NIL) ((EQ X (CAR L)) T) (T (MEMBER X (CDR L)))))
        (MEMBER 3 '(1 2 3))
        (MEMBER 9 '(1 2 3))
        ",
    )
    .unwrap();

    assert_eq!(output, "REV2\nREVERSE\n(4 3 2 1)\nNIL\nMEMBER\nT\nNIL\n");
}

#[test]
fn test_higher_order_functions() {
    let output = run_program(
        r"
        (DEFUN MAPCAR (F L) (COND ((NULL L) NIL) (T (CONS (F (CAR L)) (MAPCAR F (CDR L))))))
        (MAPCAR (LAMBDA (X) (TIMES X X)) '(1 2 3))
        (MAPCAR (λ (X) (ATOM X)) '(A (B) 3))
        (DEFUN COMPOSE2 (F G X) (F (G X)))
        (COMPOSE2 (LAMBDA (N) (PLUS N 1)) (LAMBDA (N) (TIMES N 10)) 4)
        ",
    )
    .unwrap();

    assert_eq!(output, "MAPCAR\n(1 4 9)\n(T NIL T)\nCOMPOSE2\n41\n");
}

#[test]
fn test_gcd_and_arithmetic() {
    let output = run_program(
        r"
        (DEFUN GCD (A B) (COND ((EQ B 0) A) (T (GCD B (REMAINDER A B)))))
        (GCD 48 18)
        (LET ((A 7) (B 2)) (LIST (QUOTIENT A B) (REMAINDER A B) (MINUS A B)))
        (ADD (MUL 3 4) (SUB 10 4))
        ",
    )
    .unwrap();

    assert_eq!(output, "GCD\n6\n(3 1 5)\n18\n");
}

#[test]
fn test_deep_recursion() {
    let elements: Vec<String> = (1..=200).map(|n| n.to_string()).collect();
    let source = format!(
        r"
        (DEFUN COUNTDOWN (N) (COND ((EQ N 0) 0) (T (COUNTDOWN (MINUS N 1)))))
        (COUNTDOWN 500)
        (DEFUN LEN (L) (COND ((NULL L) 0) (T (PLUS 1 (LEN (CDR L))))))
        (LEN '({}))
        (DEFUN SUM (N) (COND ((EQ N 0) 0) (T (PLUS N (SUM (MINUS N 1))))))
        (SUM 1000)
        ",
        elements.join(" ")
    );

    let output = on_eval_stack(|| run_program(&source)).unwrap();
    assert_eq!(output, "COUNTDOWN\n0\nLEN\n200\nSUM\n500500\n");
}

#[test]
fn test_runaway_recursion_is_an_error() {
    let err = on_eval_stack(|| run_program("(DEFUN F (N) (F N)) (F 1)")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Evaluation);
    assert!(err.to_string().contains("Call depth limit exceeded in F"), "{err}");
}

#[test]
fn test_error_categories_at_program_level() {
    let cases = vec![
        ("(UNDEFINED 1)", ErrorKind::Environment),
        ("(DEFUN F (X) (X)) (F)", ErrorKind::FunctionDefinition),
        ("(DEFUN F (X) (X)) (F 1 2)", ErrorKind::FunctionDefinition),
        ("(DEFUN G (X X) (X))", ErrorKind::FunctionDefinition),
        ("(CONS 1 2)", ErrorKind::NodeInit),
        ("(QUOTIENT 1 0)", ErrorKind::Evaluation),
        ("(PLUS 1", ErrorKind::Parse),
        ("12X", ErrorKind::NodeInit),
    ];

    for (source, kind) in cases {
        let err = run_program(source).unwrap_err();
        assert_eq!(err.kind(), kind, "{source}: {err}");
    }
}

#[test]
fn test_scopes_survive_failures() {
    let mut env = Environment::new();
    eval_str("(DEFUN BOOM (X) (CAR X))", &mut env).unwrap();

    let err = eval_str("(LET ((Y 1)) (BOOM 5))", &mut env).unwrap_err();
    assert!(err.to_string().contains("CAR requires a list"), "{err}");
    assert!(!env.is_defined_v("X"));
    assert!(!env.is_defined_v("Y"));
    assert!(env.get_variables().is_empty());

    assert_eq!(
        eval_str("(BOOM '(7 8))", &mut env).unwrap(),
        parse_node("7").unwrap()
    );
}

#[test]
fn test_lambda_registry_is_keyed_by_formals() {
    let mut env = Environment::new();
    eval_str("((LAMBDA (P Q) (PLUS P Q)) 1 2)", &mut env).unwrap();
    eval_str("((LAMBDA (P Q) (TIMES P Q)) 3 4)", &mut env).unwrap();

    let lambdas = env.get_lambdas();
    let key = parse_node("(P Q)").unwrap();
    assert_eq!(lambdas.len(), 1);
    assert_eq!(lambdas[&key].body(), &parse_node("(TIMES P Q)").unwrap());
    assert_eq!(
        env.exec_lamb(&key, &parse_node("(5 6)").unwrap()).unwrap(),
        parse_node("30").unwrap()
    );
}
