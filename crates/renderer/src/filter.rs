//! Separable Gaussian smoothing of row-major grids.
//!
//! Boundaries use half-sample symmetric reflection (`d c b a | a b c d | d c b a`)
//! and the kernel is truncated at `4σ`, which matches the conventional
//! `gaussian_filter` behaviour for bathymetry smoothing.

/// Kernel truncation in standard deviations.
const TRUNCATE: f64 = 4.0;

/// Normalized 1-D Gaussian weights of radius `round(TRUNCATE * sigma)`.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as usize;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / denom).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Reflect an out-of-range index back into `0..len`.
fn reflect(index: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    let period = 2 * len;
    let mut i = index.rem_euclid(period);
    if i >= len {
        i = period - 1 - i;
    }
    i as usize
}

fn convolve_rows(data: &[f64], width: usize, height: usize, kernel: &[f64]) -> Vec<f64> {
    let radius = (kernel.len() / 2) as isize;
    let mut out = vec![0.0; data.len()];
    for row in 0..height {
        let line = &data[row * width..(row + 1) * width];
        for col in 0..width {
            out[row * width + col] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * line[reflect(col as isize + k as isize - radius, width)])
                .sum();
        }
    }
    out
}

fn convolve_cols(data: &[f64], width: usize, height: usize, kernel: &[f64]) -> Vec<f64> {
    let radius = (kernel.len() / 2) as isize;
    let mut out = vec![0.0; data.len()];
    for row in 0..height {
        for col in 0..width {
            out[row * width + col] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let r = reflect(row as isize + k as isize - radius, height);
                    w * data[r * width + col]
                })
                .sum();
        }
    }
    out
}

/// Gaussian blur of a `width x height` grid with standard deviation `sigma`
/// (in cells). A non-positive sigma returns the input unchanged.
pub fn gaussian_filter(data: &[f64], width: usize, height: usize, sigma: f64) -> Vec<f64> {
    if sigma <= 0.0 || width == 0 || height == 0 || data.len() != width * height {
        return data.to_vec();
    }
    let kernel = gaussian_kernel(sigma);
    let horizontal = convolve_rows(data, width, height, &kernel);
    convolve_cols(&horizontal, width, height, &kernel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_radius_and_sum() {
        let k = gaussian_kernel(0.5);
        assert_eq!(k.len(), 5);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(k[2] > k[1] && k[1] > k[0]);
        assert_eq!(k[0], k[4]);
    }

    #[test]
    fn test_reflect() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(2, 4), 2);
        assert_eq!(reflect(-3, 1), 0);
    }

    #[test]
    fn test_constant_is_preserved() {
        let data = vec![-250.0; 36];
        let out = gaussian_filter(&data, 6, 6, 0.5);
        assert!(out.iter().all(|v| (v + 250.0).abs() < 1e-9));
    }

    #[test]
    fn test_impulse_spreads_and_conserves_mass() {
        let mut data = vec![0.0; 49];
        data[24] = 1.0;
        let out = gaussian_filter(&data, 7, 7, 0.5);
        assert!(out[24] < 1.0);
        assert!(out[23] > 0.0 && out[17] > 0.0);
        assert!((out.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_sigma_is_identity() {
        let data: Vec<f64> = (0..9).map(f64::from).collect();
        assert_eq!(gaussian_filter(&data, 3, 3, 0.0), data);
    }
}
