//! End-to-end run of all six stages against mock providers.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use studioflow::prelude::*;
use studioflow::providers::ImageOptions;
use studioflow::testing::{
    MapFetcher, SequenceImageGenerator, SequenceVideoGenerator, StaticSpeechSynthesizer,
    StaticTextGenerator,
};

const SCRIPT: &str = "Dawn breaks over the ridge.\n\nA hiker unzips a glowing backpack.\n\nHer phone lights up, fully charged.";
const PROMPTS: &str = "1. Misty mountain ridge at sunrise\n2. Hiker opening a solar backpack\n3. Phone screen showing 100% battery";

fn providers() -> ProviderSet {
    ProviderSet {
        text: Arc::new(StaticTextGenerator::with_sequence(vec![
            Ok(SCRIPT.to_string()),
            Ok(PROMPTS.to_string()),
        ])),
        speech: Arc::new(StaticSpeechSynthesizer::default()),
        images: Arc::new(SequenceImageGenerator::new()),
        videos: Arc::new(SequenceVideoGenerator::new()),
        fetcher: Arc::new(MapFetcher::new().failing("https://videos.test/2.mp4")),
        voice_id: "narrator".to_string(),
        image_options: ImageOptions::default(),
    }
}

#[tokio::test]
async fn full_pipeline_with_persistence_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn StoreBackend> = Arc::new(JsonFileBackend::new(dir.path()).unwrap());
    let store = Arc::new(
        PipelineStore::new("Solar Backpack")
            .with_backend(backend.clone())
            .unwrap(),
    );
    let sink = Arc::new(CollectingEventSink::new());
    let driver = StageDriver::new(store.clone(), sink.clone());
    let gate = driver.gate();
    let set = providers();
    let ctx = RunContext::new();

    for stage in StageId::ALL {
        assert!(gate.can_run(stage), "{stage} should be unblocked");
        let artifact = driver.run(set.runner(stage, "solar backpack launch").as_ref(), &ctx).await.unwrap();
        assert!(!artifact.is_empty());
        gate.approve(stage).unwrap();
    }

    let reloaded = PipelineStore::load(backend, store.project_id()).unwrap();
    for stage in StageId::ALL {
        assert!(reloaded.is_approved(stage));
    }
    assert_eq!(reloaded.name(), "Solar Backpack");

    let bundle = ExportAggregator::new(store.clone(), set.fetcher.clone())
        .with_events(sink.clone())
        .export()
        .await
        .unwrap();

    // 3 images + 2 of 3 clips + narration + script + prompts
    assert_eq!(bundle.manifest.files.len(), 8);
    assert_eq!(bundle.failures.len(), 1);
    assert_eq!(bundle.failures[0].stage, StageId::Videos);
    assert_eq!(sink.events_of_type("item.generated").len(), 6);
    assert_eq!(sink.events_of_type("export.item_failed").len(), 1);
}

#[tokio::test]
async fn rejection_blocks_downstream_but_keeps_artifacts() {
    let store = Arc::new(PipelineStore::new("demo"));
    let driver = StageDriver::silent(store.clone());
    let gate = driver.gate();
    let set = providers();
    let ctx = RunContext::new();

    for stage in [StageId::Script, StageId::Narration, StageId::ImagePrompts] {
        driver.run(set.runner(stage, "brief").as_ref(), &ctx).await.unwrap();
        gate.approve(stage).unwrap();
    }

    gate.reject(StageId::Script).unwrap();

    assert_eq!(store.status(StageId::Script), ArtifactStatus::Pending);
    assert!(store.state(StageId::Script).artifact.is_none());
    assert!(store.is_approved(StageId::Narration));
    assert!(store.state(StageId::ImagePrompts).artifact.is_some());

    let err = driver
        .run(set.runner(StageId::Narration, "brief").as_ref(), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::Gate(GateError::UpstreamNotApproved { .. })));
    assert!(gate.approve(StageId::Narration).is_err());
    assert!(!gate.can_run(StageId::ImagePrompts));
}
