//! Compression parameter blocks: the builder-facing configuration surface for each back-end
//! codec, plumbed through [`crate::EncodeOptions`].

use zstd_safe::CompressionLevel;

/// Zstandard-family compression parameters.
#[derive(Debug, Clone)]
pub struct ZstdParams {
    pub(crate) level: CompressionLevel,
    pub(crate) strategy: Option<zstd_safe::Strategy>,
    pub(crate) nb_workers: u32,
    pub(crate) cpuset: Option<Vec<usize>>,
}

impl Default for ZstdParams {
    fn default() -> Self {
        Self {
            level: CompressionLevel::default(),
            strategy: None,
            nb_workers: 0,
            cpuset: None,
        }
    }
}

impl ZstdParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the zstd compression level.
    pub fn level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    /// Overrides zstd's automatic strategy selection for the given level.
    pub fn strategy(mut self, strategy: zstd_safe::Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Requests `n` internal zstd worker threads. Only has an effect when this crate is built
    /// with the `zstdmt` feature; ignored otherwise.
    pub fn nb_workers(mut self, n: u32) -> Self {
        self.nb_workers = n;
        self
    }

    /// Advisory set of CPU indices the caller would like compression work pinned to.
    ///
    /// `zstd-safe` exposes no API to actually bind its internal worker pool to specific CPUs, so
    /// this is recorded but not enforced; it exists so callers migrating from a system that did
    /// support CPU affinity have somewhere to put that configuration without it silently
    /// vanishing.
    pub fn cpuset(mut self, cpus: Vec<usize>) -> Self {
        self.cpuset = Some(cpus);
        self
    }
}

/// LZ4-family compression parameters.
#[derive(Debug, Clone, Copy)]
pub struct Lz4Params {
    pub(crate) level: u32,
}

impl Default for Lz4Params {
    fn default() -> Self {
        Self { level: 0 }
    }
}

impl Lz4Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the LZ4 compression level (0 = fast mode, higher favors ratio via LZ4HC).
    pub fn level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }
}

/// The codec and parameters a [`crate::Writer`] or [`crate::Reader`] was configured with.
#[derive(Debug, Clone)]
pub(crate) enum CompressionParams {
    Zstd(ZstdParams),
    Lz4(Lz4Params),
}
