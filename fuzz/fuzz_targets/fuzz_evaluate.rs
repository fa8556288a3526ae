#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ndarray::Array2;
use xgp::parse_text;

/// Structured input for evaluation fuzzing.
#[derive(Arbitrary, Debug)]
struct EvalInput {
    /// Program text.
    program: String,
    /// Row count (capped).
    rows: u8,
    /// Column count (capped).
    cols: u8,
    /// Feature values, cycled to fill the matrix.
    values: Vec<f64>,
}

fuzz_target!(|input: EvalInput| {
    let Ok(node) = parse_text(&input.program) else {
        return;
    };

    // Cap inputs to avoid OOM
    let rows = usize::from(input.rows % 32);
    let cols = usize::from(input.cols % 8);
    let x = Array2::from_shape_fn((rows, cols), |(i, j)| {
        if input.values.is_empty() {
            0.0
        } else {
            input.values[(i * cols + j) % input.values.len()]
        }
    });

    // Evaluation either fails cleanly or yields one value per row.
    if let Ok(out) = node.evaluate(x.view()) {
        assert_eq!(out.len(), rows);
    }
});
