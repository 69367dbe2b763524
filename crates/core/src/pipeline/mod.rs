use crate::{
    AppConfig, AudioEngine, FrequencySampler, LoadEvent, LoadTicket, ParameterMapper, Result,
    RingLayout, RingScene, SamplerStatus, SessionId, SharedAnalyzer, VisualElement,
};

/// Wires the playback manager, sampler, mapper and element arena into the
/// per-frame update the render loop drives.
#[derive(Debug)]
pub struct Visualiser {
    engine: AudioEngine,
    sampler: FrequencySampler,
    mapper: ParameterMapper,
    scene: RingScene,
    frames: u64,
}

impl Visualiser {
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let analyzer = SharedAnalyzer::new();
        Ok(Self {
            engine: AudioEngine::with_analyzer(config, analyzer.clone()),
            sampler: FrequencySampler::for_config(analyzer, &config.analyzer),
            mapper: ParameterMapper::new(RingLayout::from(&config.ring)),
            scene: RingScene::new(&config.ring),
            frames: 0,
        })
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AudioEngine {
        &mut self.engine
    }

    pub fn sampler(&self) -> &FrequencySampler {
        &self.sampler
    }

    pub fn sampler_status(&self) -> SamplerStatus {
        self.sampler.status()
    }

    /// Synchronous load; see [`AudioEngine::load_and_play`].
    pub fn load_and_play(&mut self, bytes: Vec<u8>) -> Result<SessionId> {
        self.engine.load_and_play(bytes)
    }

    /// Background load, installed by a later [`frame`](Self::frame).
    pub fn request_load(&mut self, bytes: Vec<u8>) -> Result<LoadTicket> {
        self.engine.request_load(bytes)
    }

    pub fn elements(&self) -> &[VisualElement] {
        self.scene.elements()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Runs one frame: installs finished loads, advances playback by `delta`
    /// seconds, samples the analyzer and updates the elements in place.
    pub fn frame(&mut self, delta: f32) -> &[VisualElement] {
        for event in self.engine.poll_loads() {
            if let LoadEvent::Started { session, replaced, .. } = event {
                tracing::debug!(%session, ?replaced, frame = self.frames, "session swapped at frame start");
            }
        }

        self.engine.advance(delta);
        let snapshot = self.sampler.sample().clone();
        // No audio yet: keep whatever was drawn last.
        if self.sampler.status() != SamplerStatus::Idle {
            let updates = self.mapper.evaluate(&snapshot);
            self.scene.apply_updates(updates);
        }
        self.frames += 1;

        self.scene.elements()
    }
}
