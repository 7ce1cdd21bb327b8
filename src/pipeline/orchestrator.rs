use std::{ffi::OsStr, fmt};

use anyhow::Context as _;
use uuid::Uuid;

use crate::{
    artifact::{
        output::GrainedImage,
        store::{ArtifactRole, ArtifactStats, ArtifactStore, TemporaryArtifact},
    },
    foundation::error::{FilmgrainError, FilmgrainResult},
    grain::{args::GrainArgs, params::GrainParameters},
    normalize::{
        decode::DecoderRegistry,
        normalizer::{CANONICAL_SUFFIX, Normalizer, SourceImage},
    },
    pipeline::config::PipelineConfig,
    process::invoker::ProcessInvoker,
};

/// Where one invocation currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    /// Nothing done yet.
    Idle,
    /// Decoding and re-encoding the input.
    Normalizing,
    /// Running the external tool.
    Invoking,
    /// Output handed to the caller.
    Succeeded,
    /// Stopped with an error; intermediates removed.
    Failed,
}

impl PipelineStage {
    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: Self) -> bool {
        use PipelineStage::*;
        matches!(
            (self, next),
            (Idle, Normalizing)
                | (Idle, Failed)
                | (Normalizing, Invoking)
                | (Normalizing, Failed)
                | (Invoking, Succeeded)
                | (Invoking, Failed)
        )
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Normalizing => "normalizing",
            Self::Invoking => "invoking",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    debug_assert!(stage.can_advance_to(next), "illegal transition {stage} -> {next}");
    tracing::debug!(from = %stage, to = %next, "pipeline stage");
    *stage = next;
}

/// `apply_grain`: normalize, run the grain tool, hand back the output.
///
/// Shared by reference between concurrent requests; every invocation gets its own artifacts.
#[derive(Debug)]
pub struct Pipeline {
    executable: std::ffi::OsString,
    normalizer: Normalizer,
    store: ArtifactStore,
    invoker: ProcessInvoker,
}

impl Pipeline {
    /// Pipeline with the default decoder chain.
    pub fn new(config: PipelineConfig) -> FilmgrainResult<Self> {
        Self::with_decoders(config, DecoderRegistry::default())
    }

    /// Pipeline with an explicit decoder chain.
    pub fn with_decoders(config: PipelineConfig, decoders: DecoderRegistry) -> FilmgrainResult<Self> {
        config.validate()?;
        let store = match &config.work_dir {
            Some(dir) => ArtifactStore::new(dir),
            None => ArtifactStore::in_temp_dir(),
        };
        tracing::debug!(
            executable = %config.executable.to_string_lossy(),
            work_dir = %store.root().display(),
            timeout = ?config.timeout,
            decoders = ?decoders.names(),
            "pipeline configured"
        );
        Ok(Self {
            executable: config.executable,
            normalizer: Normalizer::new(decoders),
            store,
            invoker: ProcessInvoker::new().with_timeout(config.timeout),
        })
    }

    /// Grain tool this pipeline runs.
    pub fn executable(&self) -> &OsStr {
        &self.executable
    }

    /// Acquisition/release counts across all invocations so far.
    pub fn artifact_stats(&self) -> ArtifactStats {
        self.store.stats()
    }

    /// Apply film grain to `source`.
    ///
    /// On success the caller owns the returned image and its backing file. On failure every
    /// artifact this call created has been removed.
    #[tracing::instrument(
        skip_all,
        fields(invocation = tracing::field::Empty, input_bytes = source.bytes().len())
    )]
    pub fn apply_grain(
        &self,
        source: &SourceImage,
        params: &GrainParameters,
    ) -> FilmgrainResult<GrainedImage> {
        let id = Uuid::new_v4().simple().to_string();
        let tag = &id[..12];
        tracing::Span::current().record("invocation", tag);
        let store = self.store.tagged(tag);
        tracing::info!(params = ?params, hint = ?source.declared_format(), "applying grain");

        let mut stage = PipelineStage::Idle;
        if let Err(err) = params.validate() {
            advance(&mut stage, PipelineStage::Failed);
            return Err(err);
        }

        advance(&mut stage, PipelineStage::Normalizing);
        let mut normalized = match self.normalizer.normalize(source, &store) {
            Ok(artifact) => artifact,
            Err(err) => {
                advance(&mut stage, PipelineStage::Failed);
                tracing::info!(error = %err, "input rejected");
                return Err(err);
            }
        };

        advance(&mut stage, PipelineStage::Invoking);
        let invoked = self.invoke(&store, &normalized, params);

        // The normalized copy is only an intermediate: it goes on every path.
        let cleanup = normalized.release();

        match invoked {
            Ok(output) => {
                if let Err(err) = cleanup {
                    tracing::warn!(error = %err, "failed to remove normalized artifact");
                }
                let image = output.into_output()?;
                advance(&mut stage, PipelineStage::Succeeded);
                tracing::info!(output = %image.path().display(), "grain applied");
                Ok(image)
            }
            Err(err) => {
                if let Err(cleanup_err) = cleanup {
                    tracing::warn!(error = %cleanup_err, "failed to remove normalized artifact");
                }
                advance(&mut stage, PipelineStage::Failed);
                Err(err)
            }
        }
    }

    fn invoke(
        &self,
        store: &ArtifactStore,
        normalized: &TemporaryArtifact,
        params: &GrainParameters,
    ) -> FilmgrainResult<TemporaryArtifact> {
        let mut output = store.acquire(ArtifactRole::Output, CANONICAL_SUFFIX)?;
        let args = GrainArgs::from_params(params).output_input(output.path(), normalized.path());
        tracing::debug!(
            program = %self.executable.to_string_lossy(),
            args = %args,
            "running grain tool"
        );

        let ran = self
            .invoker
            .run(&self.executable, args.as_slice())
            .and_then(|out| {
                if !out.stdout.is_empty() {
                    tracing::debug!(stdout = %out.stdout, "grain tool output");
                }
                ensure_written(&output, &self.executable)
            });

        match ran {
            Ok(()) => Ok(output),
            Err(err) => {
                if let Err(cleanup) = output.release() {
                    tracing::warn!(error = %cleanup, "failed to remove output artifact");
                }
                Err(err)
            }
        }
    }
}

fn ensure_written(output: &TemporaryArtifact, program: &OsStr) -> FilmgrainResult<()> {
    let len = std::fs::metadata(output.path())
        .with_context(|| {
            format!(
                "{} exited successfully but its output '{}' is unreadable",
                program.to_string_lossy(),
                output.path().display()
            )
        })?
        .len();
    if len == 0 {
        return Err(FilmgrainError::Other(anyhow::anyhow!(
            "{} exited successfully but wrote nothing to '{}'",
            program.to_string_lossy(),
            output.path().display()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/orchestrator.rs"]
mod tests;
