/// Summed-area tables of an 8-bit grayscale buffer and of its squares.
///
/// Gives O(1) window sums for normalizing correlation scores.
pub struct IntegralImage {
    stride: usize,
    height: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl IntegralImage {
    pub fn new(data: &[u8], width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        let stride = width + 1;
        let mut sum = vec![0.0f64; stride * (height + 1)];
        let mut sum_sq = vec![0.0f64; stride * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for x in 0..width {
                let v = data[y * width + x] as f64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sum_sq[idx] = sum_sq[idx - stride] + row_sq;
            }
        }
        Self {
            stride,
            height,
            sum,
            sum_sq,
        }
    }

    pub fn width(&self) -> usize {
        self.stride - 1
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Sum and sum of squares over the `w` x `h` window at `(x, y)`.
    pub fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (f64, f64) {
        let s = self.stride;
        let (a, b, c, d) = (y * s + x, y * s + x + w, (y + h) * s + x, (y + h) * s + x + w);
        (
            self.sum[d] - self.sum[b] - self.sum[c] + self.sum[a],
            self.sum_sq[d] - self.sum_sq[b] - self.sum_sq[c] + self.sum_sq[a],
        )
    }
}
