use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, info_span, Instrument};

use crate::engine::captions::build_srt;
use crate::engine::{
    Engine, EngineKind, EngineOutput, EngineSet, InstrumentalInput, MelodyInput, VocalsInput,
};
use crate::error::EngineError;
use crate::jobs::{JobOutcome, Stage};
use crate::records::{GenerationRecord, RecordStore};
use crate::sanitize;
use crate::storage::AssetFile;

use super::context::PipelineContext;
use super::error::PipelineError;
use super::progress::{ProgressEvent, ProgressReporter};

/// Progress reported when each stage starts.
pub mod checkpoints {
    pub const PLANNING: u8 = 5;
    pub const INSTRUMENTAL: u8 = 20;
    pub const MELODY: u8 = 40;
    pub const VOCALS: u8 = 60;
    pub const MIXING: u8 = 75;
    pub const VIDEO: u8 = 85;
    pub const FINALIZING: u8 = 95;
}

/// Drives one request through every generation stage, strictly in order.
pub struct Pipeline {
    engines: Arc<EngineSet>,
    records: Arc<dyn RecordStore>,
}

impl Pipeline {
    pub fn new(engines: Arc<EngineSet>, records: Arc<dyn RecordStore>) -> Self {
        Self { engines, records }
    }

    /// Runs every stage and reports the terminal event.
    ///
    /// The generation record is written before `Completed` is reported; a
    /// failure anywhere reports `Failed` and writes nothing.
    pub async fn run(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<JobOutcome, PipelineError> {
        let span = info_span!("pipeline",
            job_id = %ctx.job_id,
            prompt = %sanitize::redact_prompt(&ctx.request.music_prompt),
            bpm = ctx.plan.bpm,
        );

        let result = self.run_stages(&mut ctx, progress).instrument(span.clone()).await;

        span.in_scope(|| match result {
            Ok(outcome) => {
                info!(audio = %outcome.audio, videos = outcome.videos.len(), "Generation complete");
                progress.report(ProgressEvent::Completed {
                    outcome: outcome.clone(),
                });
                Ok(outcome)
            }
            Err(e) => {
                error!("Generation failed: {}", e);
                progress.report(ProgressEvent::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        })
    }

    async fn run_stages(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<JobOutcome, PipelineError> {
        // Step 1: Planning
        progress.report(ProgressEvent::stage(
            Stage::Planning,
            checkpoints::PLANNING,
            "Planning track structure...",
        ));
        ctx.assets.ensure_dir().await?;

        // Step 2: Instrumental
        self.step_instrumental(ctx, progress)
            .instrument(info_span!("instrumental"))
            .await?;

        // Step 3: Melody
        self.step_melody(ctx, progress)
            .instrument(info_span!("melody"))
            .await?;

        // Step 4: Vocals, only with lyrics
        if ctx.request.lyrics().is_some() {
            self.step_vocals(ctx, progress)
                .instrument(info_span!("vocals"))
                .await?;
        }

        // Step 5: Mix
        self.step_mix(ctx, progress)
            .instrument(info_span!("mix"))
            .await?;

        // Step 6: Videos
        if !ctx.request.requested_styles().is_empty() {
            self.step_videos(ctx, progress)
                .instrument(info_span!("video"))
                .await?;
        }

        // Step 7: Finalize
        progress.report(ProgressEvent::stage(
            Stage::Finalizing,
            checkpoints::FINALIZING,
            "Saving generation...",
        ));
        self.step_finalize(ctx).await
    }

    async fn step_instrumental(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        progress.report(ProgressEvent::stage(
            Stage::Instrumental,
            checkpoints::INSTRUMENTAL,
            "Generating instrumental...",
        ));

        let input = InstrumentalInput {
            prompt: ctx.request.music_prompt.clone(),
            duration_secs: ctx.request.duration,
            seed: ctx.request.seed,
            plan: ctx.plan.clone(),
        };
        let candidates: [&dyn Engine<InstrumentalInput>; 2] =
            [&self.engines.riffusion, &self.engines.dsp];
        let output = ctx.assets.path(AssetFile::Instrumental);

        match first_available(Stage::Instrumental, &candidates, &input, &output).await? {
            Some((kind, path)) => {
                ctx.engines.insert(Stage::Instrumental, kind);
                ctx.instrumental = Some(path);
                Ok(())
            }
            None => Err(PipelineError::NoEngine {
                stage: Stage::Instrumental,
            }),
        }
    }

    async fn step_melody(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        progress.report(ProgressEvent::stage(
            Stage::Melody,
            checkpoints::MELODY,
            "Generating melody...",
        ));

        let input = MelodyInput {
            duration_secs: ctx.request.duration,
            seed: ctx.request.seed,
            plan: ctx.plan.clone(),
        };
        let candidates: [&dyn Engine<MelodyInput>; 1] = [&self.engines.magenta];
        let output = ctx.assets.path(AssetFile::Melody);

        match first_available(Stage::Melody, &candidates, &input, &output).await? {
            Some((kind, path)) => {
                ctx.engines.insert(Stage::Melody, kind);
                ctx.melody = Some(path);
            }
            None => info!("Skipping melody"),
        }
        Ok(())
    }

    async fn step_vocals(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let Some(lyrics) = ctx.request.lyrics().map(str::to_string) else {
            return Ok(());
        };

        progress.report(ProgressEvent::stage(
            Stage::Vocals,
            checkpoints::VOCALS,
            "Synthesizing vocals...",
        ));

        let srt = build_srt(&lyrics, ctx.request.duration);
        if !srt.is_empty() {
            ctx.captions = Some(
                ctx.assets
                    .write(AssetFile::Captions, srt.as_bytes())
                    .await?,
            );
        }

        let input = VocalsInput {
            lyrics,
            language: ctx.request.language_code(),
            duration_secs: ctx.request.duration,
            plan: ctx.plan.clone(),
        };
        let candidates: [&dyn Engine<VocalsInput>; 2] = [&self.engines.coqui, &self.engines.dsp];
        let output = ctx.assets.path(AssetFile::Vocals);

        match first_available(Stage::Vocals, &candidates, &input, &output).await? {
            Some((kind, path)) => {
                ctx.engines.insert(Stage::Vocals, kind);
                ctx.vocals = Some(path);
                Ok(())
            }
            None => Err(PipelineError::NoEngine {
                stage: Stage::Vocals,
            }),
        }
    }

    async fn step_mix(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        progress.report(ProgressEvent::stage(
            Stage::Mixing,
            checkpoints::MIXING,
            "Mixing and mastering...",
        ));

        if ctx.stems().len() < 2 {
            info!(
                stems = ctx.stems().len(),
                "Adding texture stem so the mix has two inputs"
            );
            let path = self
                .engines
                .dsp
                .texture(
                    &ctx.plan,
                    ctx.request.duration,
                    &ctx.assets.path(AssetFile::Texture),
                )
                .await
                .map_err(|e| PipelineError::engine(Stage::Mixing, e))?;
            ctx.texture = Some(path);
        }

        let stems = ctx.stems();
        let mix = self
            .engines
            .mixer
            .mix(&stems, &ctx.assets.path(AssetFile::Mix))
            .await
            .map_err(|e| PipelineError::engine(Stage::Mixing, e))?;

        ctx.engines.insert(Stage::Mixing, EngineKind::Ffmpeg);
        ctx.mix = Some(mix);
        Ok(())
    }

    async fn step_videos(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let styles = ctx.request.requested_styles();
        let audio = match &ctx.mix {
            Some(mix) => mix.clone(),
            None => return Err(PipelineError::NoEngine { stage: Stage::Mixing }),
        };

        for (index, style) in styles.iter().enumerate() {
            progress.report(ProgressEvent::stage(
                Stage::Video,
                video_progress(index, styles.len()),
                format!("Rendering {}...", style.label()),
            ));

            let path = self
                .engines
                .video
                .render(
                    *style,
                    &audio,
                    ctx.captions.as_deref(),
                    &ctx.assets.path(AssetFile::Video(*style)),
                )
                .await
                .map_err(|e| PipelineError::engine(Stage::Video, e))?;
            ctx.videos.insert(*style, path);
        }

        ctx.engines.insert(Stage::Video, EngineKind::Ffmpeg);
        Ok(())
    }

    async fn step_finalize(&self, ctx: &PipelineContext) -> Result<JobOutcome, PipelineError> {
        let mix = ctx.mix.as_deref().ok_or(PipelineError::NoEngine {
            stage: Stage::Mixing,
        })?;
        let url = |path: &Path| ctx.assets.url_for(path);
        let optional_url = |path: &Option<PathBuf>| path.as_deref().map(url).transpose();

        let mix_url = url(mix)?;
        let videos = ctx
            .videos
            .iter()
            .map(|(style, path)| Ok((style.slug().to_string(), url(path)?)))
            .collect::<Result<BTreeMap<_, _>, PipelineError>>()?;

        let record = GenerationRecord {
            id: ctx.job_id.clone(),
            request: serde_json::to_value(&ctx.request)?,
            bpm: ctx.plan.bpm,
            key: ctx.plan.key.clone(),
            mix_url: mix_url.clone(),
            instrumental_url: optional_url(&ctx.instrumental)?,
            melody_url: optional_url(&ctx.melody)?,
            vocals_url: optional_url(&ctx.vocals)?,
            video_urls: videos.clone(),
            engines: ctx.engines.clone(),
            created_at: Utc::now(),
        };
        let records = Arc::clone(&self.records);
        let record = tokio::task::spawn_blocking(move || records.insert(&record).map(|_| record))
            .await??;
        info!(record_id = %record.id, "Generation record written");

        Ok(JobOutcome {
            audio: mix_url,
            videos,
            plan: ctx.plan.clone(),
        })
    }
}

/// Progress at the start of video `index` out of `count`, spread over the
/// video range.
fn video_progress(index: usize, count: usize) -> u8 {
    let span = usize::from(checkpoints::FINALIZING - checkpoints::VIDEO);
    let offset = span * index / count.max(1);
    checkpoints::VIDEO + offset as u8
}

/// Tries `engines` in order and returns the first artifact produced.
///
/// An unavailable engine falls through to the next one. A failing engine
/// aborts the stage.
async fn first_available<I: Sync>(
    stage: Stage,
    engines: &[&dyn Engine<I>],
    input: &I,
    output: &Path,
) -> Result<Option<(EngineKind, PathBuf)>, PipelineError> {
    for engine in engines {
        let kind = engine.kind();
        match engine.generate(input, output).await {
            Ok(EngineOutput::Generated(path)) => {
                info!(
                    %stage,
                    engine = %kind,
                    file = %sanitize::redact_path(&path),
                    "Stage produced by {}",
                    kind
                );
                return Ok(Some((kind, path)));
            }
            Ok(EngineOutput::Unavailable { reason }) => {
                info!(%stage, engine = %kind, "Engine unavailable, falling back: {}", reason);
            }
            Err(e) => return Err(stage_failure(stage, kind, e)),
        }
    }
    Ok(None)
}

fn stage_failure(stage: Stage, kind: EngineKind, source: EngineError) -> PipelineError {
    error!(%stage, engine = %kind, "Engine failed: {}", source);
    PipelineError::engine(stage, source)
}
