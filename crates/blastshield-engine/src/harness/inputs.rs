//! Boundary-input synthesis keyed by parameter annotation.

use blastshield_core::types::ast::Param;

/// Upper bound on synthesised cases per function.
pub const MAX_CASES: usize = 8;

/// Candidate Python literals for one parameter.
pub fn boundary_inputs(param: &Param) -> Vec<&'static str> {
    let annotation = param
        .annotation
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if annotation.starts_with("int") || annotation.starts_with("float") {
        vec!["0", "-1", "10**18"]
    } else if annotation.starts_with("str") {
        vec!["''", "'x' * 10000", "'\\x00; rm -rf /'"]
    } else if annotation.starts_with("bool") {
        vec!["False", "True"]
    } else if annotation.starts_with("list") || annotation.starts_with("sequence") {
        vec!["[]", "[None]"]
    } else if annotation.starts_with("dict") || annotation.starts_with("mapping") {
        vec!["{}", "{None: None}"]
    } else if annotation.starts_with("set") {
        vec!["set()"]
    } else {
        // No usable annotation: the fallback battery.
        vec![
            "None",
            "''",
            "'x' * 10000",
            "0",
            "-1",
            "10**18",
            "[]",
            "[None]",
            "'\" OR 1=1 --'",
        ]
    }
}

/// Build up to `MAX_CASES` argument tuples for a function, pairing the
/// i-th candidate of every parameter (no cartesian blow-up).
pub fn synthesize_cases(params: &[Param]) -> Vec<Vec<&'static str>> {
    let candidates: Vec<Vec<&'static str>> = params.iter().map(boundary_inputs).collect();
    let depth = candidates
        .iter()
        .map(|c| c.len())
        .max()
        .unwrap_or(0)
        .min(MAX_CASES);

    (0..depth)
        .map(|i| {
            candidates
                .iter()
                .map(|options| options[i % options.len()])
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, annotation: Option<&str>) -> Param {
        Param {
            name: name.into(),
            annotation: annotation.map(String::from),
            has_default: false,
        }
    }

    #[test]
    fn annotated_params_get_typed_boundaries() {
        assert!(boundary_inputs(&param("n", Some("int"))).contains(&"0"));
        assert!(boundary_inputs(&param("s", Some("str"))).contains(&"''"));
        assert!(boundary_inputs(&param("xs", Some("list[int]"))).contains(&"[]"));
    }

    #[test]
    fn unannotated_params_get_the_fallback_battery() {
        let battery = boundary_inputs(&param("x", None));
        assert!(battery.contains(&"None"));
        assert!(battery.len() >= 8);
    }

    #[test]
    fn case_synthesis_is_bounded_and_arity_stable() {
        let cases = synthesize_cases(&[param("a", None), param("b", Some("int"))]);
        assert!(cases.len() <= MAX_CASES);
        assert!(cases.iter().all(|case| case.len() == 2));
    }

    #[test]
    fn zero_arity_functions_get_no_cases() {
        assert!(synthesize_cases(&[]).is_empty());
    }
}
