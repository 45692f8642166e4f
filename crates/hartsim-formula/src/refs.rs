//! Dependency token extraction and transfer-function origin parsing

use lazy_regex::{lazy_regex, Lazy, Regex};

use crate::error::{ExprError, ExprResult};
use hartsim_core::CellId;

/// The `Table.Column.Row` dependency token pattern.
static REF_PATTERN: Lazy<Regex> = lazy_regex!(
    r"\b[A-Za-z_][A-Za-z0-9_]*\.[A-Za-z_][A-Za-z0-9_]*\.[A-Za-z_][A-Za-z0-9_]*\b"
);

/// Extract the cells referenced by a formula, in first-appearance order,
/// de-duplicated.
///
/// `math.pi` / `math.e` have only two segments and never match.
pub fn extract_refs(text: &str) -> Vec<CellId> {
    let mut refs = Vec::new();
    for m in REF_PATTERN.find_iter(text) {
        if let Some(id) = CellId::from_ref(m.as_str()) {
            if !refs.contains(&id) {
                refs.push(id);
            }
        }
    }
    refs
}

/// A parsed transfer-function origin.
///
/// TFunc origins have the shape `[num],[den],delay,inputExpr`: numerator and
/// denominator polynomial coefficients, a transport delay, and the live
/// input expression. Only `input_expr` contributes dependency tokens; the
/// coefficients belong to the external simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct TfSpec {
    pub numerator: Vec<f64>,
    pub denominator: Vec<f64>,
    pub delay: f64,
    pub input_expr: String,
}

/// Parse the text of a TFunc origin (after the `$` sentinel).
pub fn parse_tfunc(text: &str) -> ExprResult<TfSpec> {
    let malformed = || ExprError::MalformedTf(text.to_string());

    let (numerator, rest) = take_coeff_list(text).ok_or_else(malformed)?;
    let rest = rest.strip_prefix(',').ok_or_else(malformed)?;
    let (denominator, rest) = take_coeff_list(rest).ok_or_else(malformed)?;
    let rest = rest.strip_prefix(',').ok_or_else(malformed)?;

    let (delay_text, input_expr) = rest.split_once(',').ok_or_else(malformed)?;
    let delay: f64 = delay_text.trim().parse().map_err(|_| malformed())?;
    let input_expr = input_expr.trim();
    if input_expr.is_empty() || denominator.is_empty() {
        return Err(malformed());
    }

    Ok(TfSpec {
        numerator,
        denominator,
        delay,
        input_expr: input_expr.to_string(),
    })
}

/// Parse a leading `[a,b,...]` coefficient list, returning it and the rest
/// of the input.
fn take_coeff_list(text: &str) -> Option<(Vec<f64>, &str)> {
    let text = text.trim_start();
    let inner = text.strip_prefix('[')?;
    let end = inner.find(']')?;
    let body = &inner[..end];
    let rest = &inner[end + 1..];

    let mut coeffs = Vec::new();
    if !body.trim().is_empty() {
        for part in body.split(',') {
            coeffs.push(part.trim().parse().ok()?);
        }
    }
    Some((coeffs, rest))
}
