use serde_json::{Map, Number, Value};

use crate::errors::{ErrorInfo, NbError};

/// Parameter name to value mapping passed to the execution engine, in the
/// order the parameters were given.
pub type Parameters = Map<String, Value>;

/// Resolves a textual parameter value the way the engine's CLI does:
/// `True`/`False`/`None`, then integers, then finite floats, else a string.
pub fn resolve_value(raw: &str) -> Value {
    match raw {
        "True" => return Value::Bool(true),
        "False" => return Value::Bool(false),
        "None" => return Value::Null,
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    if let Some(number) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }
    Value::String(raw.to_string())
}

/// Parses one `<name>=<value>` string.
pub fn parse_parameter(pair: &str) -> Result<(String, Value), NbError> {
    let Some((name, raw)) = pair.split_once('=') else {
        return Err(NbError::Usage(
            ErrorInfo::new(
                "nbtidy.param_format",
                format!("unrecognized parameter string: {pair}"),
            )
            .with_hint("pass parameters as <name>=<value>"),
        ));
    };
    Ok((name.to_string(), resolve_value(raw)))
}

/// Parses a list of `<name>=<value>` strings; later duplicates win.
pub fn parse_parameters<S: AsRef<str>>(pairs: &[S]) -> Result<Parameters, NbError> {
    let mut params = Parameters::new();
    for pair in pairs {
        let (name, value) = parse_parameter(pair.as_ref())?;
        params.insert(name, value);
    }
    Ok(params)
}

/// Renders a resolved value back to the text form the engine's CLI accepts.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
