//! Shared CPU slice kernels used by the matrix type and the layers.

/// Dot product of two equally sized slices.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Matrix-vector multiply with optional bias.
/// weight: row-major [rows][cols], vec: [cols], bias: [rows], out: [rows]
pub fn matvec_mul_add_bias(
    weight: &[f32],
    cols: usize,
    vec: &[f32],
    bias: Option<&[f32]>,
    out: &mut [f32],
) {
    for (i, (o, w_row)) in out.iter_mut().zip(weight.chunks_exact(cols)).enumerate() {
        *o = dot(w_row, vec) + bias.map_or(0.0, |b| b[i]);
    }
}

/// Numerically stable softmax over a row, in place.
///
/// Entries equal to `-inf` come out as exactly `0.0` as long as the row holds
/// at least one finite value.
pub fn softmax_in_place(row: &mut [f32]) {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max == f32::NEG_INFINITY {
        return;
    }
    let mut sum = 0.0;
    for x in row.iter_mut() {
        *x = (*x - max).exp();
        sum += *x;
    }
    for x in row.iter_mut() {
        *x /= sum;
    }
}
