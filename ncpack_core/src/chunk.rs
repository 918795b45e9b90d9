/// Regular chunk decomposition of a row-major N-D array.
///
/// Chunks are visited in row-major order of the chunk grid. Edge chunks are
/// clipped to the array bounds, so their extent may be smaller than the
/// nominal chunk shape; nothing is padded.
#[derive(Debug, Clone)]
pub struct ChunkGrid {
    shape: Vec<usize>,
    chunk: Vec<usize>,
}

impl ChunkGrid {
    pub fn new(shape: &[usize], chunk: &[usize]) -> anyhow::Result<Self> {
        if shape.len() != chunk.len() {
            anyhow::bail!(
                "chunk rank {} does not match array rank {}",
                chunk.len(),
                shape.len()
            );
        }
        if chunk.iter().any(|&c| c == 0) {
            anyhow::bail!("chunk shape {:?} has a zero-length axis", chunk);
        }
        Ok(Self {
            shape: shape.to_vec(),
            chunk: chunk.to_vec(),
        })
    }

    /// Grid used to store an array of `shape` declared with `chunk_shape`
    /// (`None` means a single chunk). Chunks are clipped to the array extent.
    pub fn for_storage(shape: &[usize], chunk_shape: Option<&[usize]>) -> anyhow::Result<Self> {
        let declared = chunk_shape.unwrap_or(shape);
        if declared.len() != shape.len() {
            anyhow::bail!(
                "chunk rank {} does not match array rank {}",
                declared.len(),
                shape.len()
            );
        }
        let clipped: Vec<usize> = declared
            .iter()
            .zip(shape)
            .map(|(c, s)| (*c).min(*s).max(1))
            .collect();
        Self::new(shape, &clipped)
    }

    pub fn chunk_shape(&self) -> &[usize] {
        &self.chunk
    }

    /// Number of chunks along each axis.
    pub fn grid_shape(&self) -> Vec<usize> {
        self.shape
            .iter()
            .zip(&self.chunk)
            .map(|(s, c)| s.div_ceil(*c))
            .collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.grid_shape().iter().product()
    }

    /// Element-index origin of every chunk, in storage order.
    pub fn origins(&self) -> Vec<Vec<usize>> {
        let grid = self.grid_shape();
        let count: usize = grid.iter().product();
        let mut out = Vec::with_capacity(count);
        let mut idx = vec![0usize; grid.len()];
        for _ in 0..count {
            out.push(idx.iter().zip(&self.chunk).map(|(i, c)| i * c).collect());
            increment(&mut idx, &grid);
        }
        out
    }

    /// Actual extent of the chunk starting at `origin`.
    pub fn extent(&self, origin: &[usize]) -> Vec<usize> {
        origin
            .iter()
            .zip(&self.chunk)
            .zip(&self.shape)
            .map(|((o, c), s)| (*c).min(s - o))
            .collect()
    }

    /// Copy one chunk's elements out of the full array's byte image.
    pub fn gather(&self, data: &[u8], elem_size: usize, origin: &[usize]) -> Vec<u8> {
        let extent = self.extent(origin);
        let mut out = Vec::with_capacity(extent.iter().product::<usize>() * elem_size);
        self.for_each_run(origin, &extent, |start, run| {
            out.extend_from_slice(&data[start * elem_size..(start + run) * elem_size]);
        });
        out
    }

    /// Inverse of [`gather`](Self::gather): write a chunk back into the full array.
    pub fn scatter(&self, dst: &mut [u8], elem_size: usize, origin: &[usize], chunk: &[u8]) {
        let extent = self.extent(origin);
        let mut pos = 0usize;
        self.for_each_run(origin, &extent, |start, run| {
            let n = run * elem_size;
            dst[start * elem_size..start * elem_size + n].copy_from_slice(&chunk[pos..pos + n]);
            pos += n;
        });
    }

    /// Visit each contiguous innermost-axis run of a chunk as
    /// (flat element offset in the full array, run length).
    fn for_each_run(&self, origin: &[usize], extent: &[usize], mut f: impl FnMut(usize, usize)) {
        let rank = self.shape.len();
        if rank == 0 {
            f(0, 1);
            return;
        }
        if extent.iter().any(|&e| e == 0) {
            return;
        }

        let mut strides = vec![1usize; rank];
        for d in (0..rank - 1).rev() {
            strides[d] = strides[d + 1] * self.shape[d + 1];
        }

        let outer = &extent[..rank - 1];
        let rows: usize = outer.iter().product();
        let mut idx = vec![0usize; rank - 1];
        for _ in 0..rows {
            let start: usize = idx
                .iter()
                .enumerate()
                .map(|(d, i)| (origin[d] + i) * strides[d])
                .sum::<usize>()
                + origin[rank - 1];
            f(start, extent[rank - 1]);
            increment(&mut idx, outer);
        }
    }
}

/// Row-major odometer step.
fn increment(idx: &mut [usize], bounds: &[usize]) {
    for d in (0..idx.len()).rev() {
        idx[d] += 1;
        if idx[d] < bounds[d] {
            return;
        }
        idx[d] = 0;
    }
}
