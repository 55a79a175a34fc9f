//! Text and math functions on arbitrary numeric arguments

use proptest::prelude::*;
use sheetcalc::prelude::*;
use sheetcalc::{Category, EvaluationContext, Function};

fn text_and_math_functions() -> Vec<Function> {
    Function::ALL
        .iter()
        .copied()
        .filter(|f| matches!(f.category(), Category::Text | Category::Math))
        .collect()
}

fn number() -> impl Strategy<Value = f64> {
    prop_oneof![
        any::<f64>(),
        -1e20..1e20f64,
        -200.0..200.0f64,
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
        Just(1e19),
        Just(-1e19),
        Just(i64::MAX as f64),
        Just(i64::MIN as f64),
    ]
}

fn argument() -> impl Strategy<Value = FormulaValue> {
    prop_oneof![
        4 => number().prop_map(FormulaValue::Number),
        1 => "[a-z ]{0,6}".prop_map(FormulaValue::Text),
    ]
}

proptest! {
    /// Extreme or non-finite arguments give a value or an error, never a panic
    #[test]
    fn prop_functions_accept_any_number(
        function in prop::sample::select(text_and_math_functions()),
        args in prop::collection::vec(argument(), 0..5),
    ) {
        let ctx = EvaluationContext::simple();
        let value = function.call(&args, &ctx);
        prop_assert!(
            !matches!(value, FormulaValue::Number(n) if n.is_nan()),
            "{} returned NaN for {:?}",
            function.name(),
            args
        );
    }
}

#[test]
fn test_saturated_positions_and_counts() {
    let ctx = EvaluationContext::simple();
    let abc = FormulaValue::text("abc");
    let huge = FormulaValue::Number(1e19);

    assert_eq!(
        Function::Mid.call(&[abc.clone(), huge.clone(), FormulaValue::Number(1.0)], &ctx),
        FormulaValue::text("")
    );
    assert_eq!(
        Function::Right.call(&[abc, FormulaValue::Number(-1e19)], &ctx),
        FormulaValue::text("")
    );
    assert!(Function::Dollar
        .call(&[FormulaValue::Number(1.0), FormulaValue::Number(1e8)], &ctx)
        .is_error());
    assert_eq!(
        Function::Fact.call(&[FormulaValue::Number(1e15)], &ctx),
        FormulaValue::Number(f64::INFINITY)
    );
    assert!(Function::Lcm.call(&[huge, FormulaValue::Number(11.0)], &ctx).is_error());
}
