use std::collections::BTreeMap;

use evalexpr::{
    eval_with_context, ContextWithMutableFunctions, ContextWithMutableVariables, EvalexprError,
    Function, HashMapContext, Value,
};
use serde::{Deserialize, Serialize};

use super::{EntityView, Evaluator};
use crate::utils::errors::SimulationError;

/// Largest magnitude at which every integral `f64` is exact.
const EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A reference evaluator for rate and condition expressions, built on
/// `evalexpr`.  Named variables and the entity function `ClientData(n)` are
/// available to every expression; an unset `ClientData` property reads as 0.
///
/// Integral numbers enter expressions as integers, so `Open == 1` holds for
/// `Open = 1.0` and `7/2` divides as integers.  A condition holds when it is
/// `true` or a non-zero number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleEvaluator {
    #[serde(default)]
    variables: BTreeMap<String, f64>,
}

impl SimpleEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: &str, value: f64) -> Self {
        self.set_variable(name, value);
        self
    }

    pub fn set_variable(&mut self, name: &str, value: f64) {
        self.variables.insert(name.to_string(), value);
    }

    fn context(&self, entity: Option<&dyn EntityView>) -> Result<HashMapContext, EvalexprError> {
        let mut context = HashMapContext::new();
        for (name, value) in &self.variables {
            context.set_value(name.clone(), number_value(*value))?;
        }
        if let Some(entity) = entity {
            let numbers: BTreeMap<usize, f64> = entity.number_properties().into_iter().collect();
            context.set_function(
                String::from("ClientData"),
                Function::new(move |argument| {
                    let index = argument.as_number()?;
                    if index < 0.0 || index.fract() != 0.0 {
                        return Err(EvalexprError::CustomMessage(format![
                            "ClientData index {} is not a property index",
                            index
                        ]));
                    }
                    Ok(number_value(
                        numbers.get(&(index as usize)).copied().unwrap_or(0.0),
                    ))
                }),
            )?;
        }
        Ok(context)
    }

    fn evaluate(
        &self,
        expression: &str,
        entity: Option<&dyn EntityView>,
    ) -> Result<Value, SimulationError> {
        self.context(entity)
            .and_then(|context| eval_with_context(expression, &context))
            .map_err(|error| SimulationError::expression(expression, error.to_string()))
    }
}

fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() <= EXACT_INTEGER {
        Value::Int(value as i64)
    } else {
        Value::Float(value)
    }
}

impl Evaluator for SimpleEvaluator {
    fn evaluate_number(
        &self,
        expression: &str,
        entity: Option<&dyn EntityView>,
    ) -> Result<f64, SimulationError> {
        match self.evaluate(expression, entity)? {
            Value::Int(value) => Ok(value as f64),
            Value::Float(value) => Ok(value),
            Value::Boolean(value) => Ok(if value { 1.0 } else { 0.0 }),
            other => Err(SimulationError::expression(
                expression,
                format!["expected a number, found {}", other],
            )),
        }
    }

    fn evaluate_condition(
        &self,
        expression: &str,
        entity: Option<&dyn EntityView>,
    ) -> Result<bool, SimulationError> {
        match self.evaluate(expression, entity)? {
            Value::Boolean(value) => Ok(value),
            Value::Int(value) => Ok(value != 0),
            Value::Float(value) => Ok(value != 0.0),
            other => Err(SimulationError::expression(
                expression,
                format!["expected a condition, found {}", other],
            )),
        }
    }
}
