//! Memory telemetry side channel
//!
//! The pipeline calls a [`MemoryProbe`] at fixed checkpoints. Probes only
//! observe; nothing on the data path reads a sample back. [`NullProbe`]
//! disables telemetry entirely.

use sysinfo::System;

/// Point in the pipeline at which a probe is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// Pipeline constructed and input mapped
    Construction,
    /// Compressed matrix reloaded from disk
    Load,
    /// Output stream opened
    StreamOpen,
    /// Columns of a slab densified
    Extract(usize),
    /// Slab reshaped into a sub-volume
    Reshape(usize),
    /// Operator applied to a slab
    Filter(usize),
    /// Halo removed from a slab
    Trim(usize),
    /// Slab appended to the output stream
    Append(usize),
    /// Output stream mapped and written as the merged volume
    Merge,
}

/// One free-memory observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemorySample {
    pub checkpoint: Checkpoint,
    /// Free memory in MiB, `None` for probes that do not measure
    pub free_mib: Option<u64>,
}

/// Diagnostic sink invoked at pipeline checkpoints
pub trait MemoryProbe {
    /// Record a sample at `checkpoint`.
    fn record(&mut self, checkpoint: Checkpoint);

    /// Samples recorded so far, in call order.
    fn samples(&self) -> &[MemorySample];

    /// Summarize recorded free-memory samples.
    fn summary(&self) -> Option<MemorySummary> {
        MemorySummary::from_samples(self.samples())
    }
}

impl<T: MemoryProbe + ?Sized> MemoryProbe for Box<T> {
    fn record(&mut self, checkpoint: Checkpoint) {
        (**self).record(checkpoint)
    }

    fn samples(&self) -> &[MemorySample] {
        (**self).samples()
    }
}

/// Probe that records nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProbe;

impl MemoryProbe for NullProbe {
    fn record(&mut self, _checkpoint: Checkpoint) {}

    fn samples(&self) -> &[MemorySample] {
        &[]
    }
}

/// Probe that records checkpoints without measuring memory
#[derive(Debug, Default, Clone)]
pub struct RecordingProbe {
    samples: Vec<MemorySample>,
}

impl RecordingProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checkpoints in call order
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.samples.iter().map(|s| s.checkpoint).collect()
    }
}

impl MemoryProbe for RecordingProbe {
    fn record(&mut self, checkpoint: Checkpoint) {
        self.samples.push(MemorySample {
            checkpoint,
            free_mib: None,
        });
    }

    fn samples(&self) -> &[MemorySample] {
        &self.samples
    }
}

/// Probe that samples host free memory through `sysinfo`
pub struct SystemMemoryProbe {
    system: System,
    samples: Vec<MemorySample>,
}

impl SystemMemoryProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            samples: Vec::new(),
        }
    }
}

impl Default for SystemMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn record(&mut self, checkpoint: Checkpoint) {
        self.system.refresh_memory();
        let free_mib = self.system.free_memory() / (1024 * 1024);
        log::trace!("memory probe {:?}: {} MiB free", checkpoint, free_mib);
        self.samples.push(MemorySample {
            checkpoint,
            free_mib: Some(free_mib),
        });
    }

    fn samples(&self) -> &[MemorySample] {
        &self.samples
    }
}

/// Start-versus-average free memory over a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySummary {
    /// Free memory at the first sample
    pub start_mib: u64,
    /// Average free memory over all later samples
    pub average_mib: u64,
    /// Number of samples averaged
    pub samples: usize,
}

impl MemorySummary {
    /// Summarize measured samples.
    ///
    /// The first measured sample is the baseline; the remaining ones are
    /// averaged. Returns `None` with fewer than two measured samples.
    pub fn from_samples(samples: &[MemorySample]) -> Option<Self> {
        let mut measured = samples.iter().filter_map(|s| s.free_mib);
        let start_mib = measured.next()?;
        let rest: Vec<u64> = measured.collect();
        if rest.is_empty() {
            return None;
        }
        let average_mib = rest.iter().sum::<u64>() / rest.len() as u64;
        Some(MemorySummary {
            start_mib,
            average_mib,
            samples: rest.len(),
        })
    }

    /// Average memory consumed relative to the baseline, in MiB
    pub fn usage_mib(&self) -> i64 {
        self.start_mib as i64 - self.average_mib as i64
    }
}

impl std::fmt::Display for MemorySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "average memory usage = {} MiB ({} samples)",
            self.usage_mib(),
            self.samples
        )
    }
}
