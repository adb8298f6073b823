use futures::StreamExt;
use remaplet::layers::added::{status_channel, StatusMessage, StatusReceiver};
use remaplet::prelude::*;

/// Integration tests for a single layer unit driven directly against the
/// headless engine.
#[cfg(test)]
mod layer_unit_tests {
    use super::*;

    const PIN_URL: &str = "https://icons.test/pin.png";

    fn engine_with_pin() -> Arc<HeadlessEngine> {
        let engine = Arc::new(HeadlessEngine::auto_ready());
        engine.add_catalog_image(PIN_URL, MapImage::blank(8, 8));
        engine
    }

    fn pins(id: &str) -> LayerDescriptor {
        LayerDescriptor::new(id, LayerType::Symbol).with_icon("pin", PIN_URL)
    }

    async fn next_status(rx: &mut StatusReceiver) -> StatusMessage {
        rx.next().await.expect("status channel closed")
    }

    async fn yield_a_few() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_register_then_teardown() {
        let engine = Arc::new(HeadlessEngine::auto_ready());
        let (tx, mut rx) = status_channel();
        let mut unit = LayerUnit::new(LayerDescriptor::new("roads", LayerType::Line));

        assert_eq!(unit.phase(), UnitPhase::Pending);
        assert!(unit.register(engine.clone(), tx.clone()));
        assert_eq!(unit.phase(), UnitPhase::Active);
        // Already registering.
        assert!(!unit.register(engine.clone(), tx.clone()));

        match next_status(&mut rx).await {
            StatusMessage::Changed { id, status } => {
                assert_eq!(id, "roads");
                assert_eq!(status, LayerStatus::Added);
            }
            other => panic!("unexpected status {other:?}"),
        }
        assert_eq!(unit.phase(), UnitPhase::Complete);
        assert_eq!(engine.layer_ids(), vec!["roads"]);

        unit.teardown(&*engine, &tx).unwrap();
        assert!(matches!(
            next_status(&mut rx).await,
            StatusMessage::Changed { status: LayerStatus::Removed, .. }
        ));
        assert_eq!(unit.phase(), UnitPhase::Pending);
        assert!(engine.layer_ids().is_empty());
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::RemoveLayer(_))),
            1
        );
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::RemoveSource(_))),
            1
        );
    }

    #[tokio::test]
    async fn test_teardown_reports_removal_when_engine_lost_layer() {
        let engine = Arc::new(HeadlessEngine::auto_ready());
        let (tx, mut rx) = status_channel();
        let mut unit = LayerUnit::new(LayerDescriptor::new("roads", LayerType::Line));

        unit.register(engine.clone(), tx.clone());
        next_status(&mut rx).await;
        engine.remove_layer("roads").unwrap();
        engine.clear_calls();

        assert!(matches!(
            unit.teardown(&*engine, &tx),
            Err(MapError::UnknownLayer(id)) if id == "roads"
        ));
        assert_eq!(unit.phase(), UnitPhase::Pending);
        assert!(matches!(
            next_status(&mut rx).await,
            StatusMessage::Changed { status: LayerStatus::Removed, .. }
        ));
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::RemoveLayer("roads".into()),
                EngineCall::RemoveSource("roads".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_symbol_icon_checked_twice() {
        let engine = engine_with_pin();
        let (tx, mut rx) = status_channel();
        let mut unit = LayerUnit::new(pins("pins"));

        unit.register(engine.clone(), tx);
        assert!(matches!(
            next_status(&mut rx).await,
            StatusMessage::Changed { status: LayerStatus::Added, .. }
        ));

        let calls: Vec<EngineCall> = engine
            .calls()
            .into_iter()
            .filter(|call| !matches!(call, EngineCall::AddLayer(_)))
            .collect();
        assert_eq!(
            calls,
            vec![
                EngineCall::HasImage("pin".into()),
                EngineCall::LoadImage(PIN_URL.into()),
                EngineCall::HasImage("pin".into()),
                EngineCall::AddImage("pin".into()),
            ]
        );
        assert!(matches!(engine.calls().last(), Some(EngineCall::AddLayer(_))));
        assert_eq!(engine.image_ids(), vec!["pin"]);
    }

    #[tokio::test]
    async fn test_existing_icon_not_loaded_again() {
        let engine = engine_with_pin();
        engine.add_image("pin", MapImage::blank(1, 1), None).unwrap();
        engine.clear_calls();
        let (tx, mut rx) = status_channel();
        let mut unit = LayerUnit::new(pins("pins"));

        unit.register(engine.clone(), tx);
        next_status(&mut rx).await;

        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::LoadImage(_))),
            0
        );
        assert_eq!(engine.layer_ids(), vec!["pins"]);
    }

    #[tokio::test]
    async fn test_failed_icon_still_adds_layer() {
        let engine = Arc::new(HeadlessEngine::auto_ready());
        let (tx, mut rx) = status_channel();
        let mut unit = LayerUnit::new(
            LayerDescriptor::new("pins", LayerType::Symbol)
                .with_icon("missing", "https://icons.test/missing.png"),
        );

        unit.register(engine.clone(), tx);
        assert!(matches!(
            next_status(&mut rx).await,
            StatusMessage::Changed { status: LayerStatus::Added, .. }
        ));
        assert_eq!(engine.layer_ids(), vec!["pins"]);
        assert!(engine.image_ids().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_icon_loads_add_image_once() {
        let engine = engine_with_pin();
        engine.hold_image_loads();
        let (tx, mut rx) = status_channel();
        let mut first = LayerUnit::new(pins("pins-1"));
        let mut second = LayerUnit::new(pins("pins-2"));

        first.register(engine.clone(), tx.clone());
        second.register(engine.clone(), tx);
        yield_a_few().await;
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::LoadImage(_))),
            2
        );

        engine.release_image_loads();
        next_status(&mut rx).await;
        next_status(&mut rx).await;

        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::AddImage(_))),
            1
        );
        assert_eq!(engine.layer_ids().len(), 2);
    }

    #[tokio::test]
    async fn test_teardown_before_add_cancels_registration() {
        let engine = engine_with_pin();
        engine.hold_image_loads();
        let (tx, mut rx) = status_channel();
        let mut unit = LayerUnit::new(pins("pins"));

        unit.register(engine.clone(), tx.clone());
        yield_a_few().await;
        unit.teardown(&*engine, &tx).unwrap();
        assert_eq!(unit.phase(), UnitPhase::Pending);

        engine.release_image_loads();
        yield_a_few().await;

        assert!(engine.layer_ids().is_empty());
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::AddLayer(_))),
            0
        );
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::RemoveLayer(_))),
            0
        );
        while let Ok(Some(message)) = rx.try_next() {
            assert!(
                !matches!(message, StatusMessage::Changed { .. }),
                "unexpected status {message:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_reorder_waits_for_both_layers() {
        let engine = Arc::new(HeadlessEngine::auto_ready());
        for id in ["a", "b"] {
            engine
                .add_layer(&LayerDescriptor::new(id, LayerType::Fill).to_spec())
                .unwrap();
        }
        let mut unit = LayerUnit::new(LayerDescriptor::new("b", LayerType::Fill));

        let added: AddedSet = ["b"].into_iter().collect();
        assert!(!unit.reorder(&*engine, Some("a"), &added, false).unwrap());
        assert!(engine.moves().is_empty());

        let added: AddedSet = ["a", "b"].into_iter().collect();
        assert!(unit.reorder(&*engine, Some("a"), &added, false).unwrap());
        assert_eq!(unit.before_id(), Some("a"));
        assert_eq!(engine.layer_ids(), vec!["b", "a"]);

        // Same neighbour: nothing to do unless the layer was displaced.
        assert!(!unit.reorder(&*engine, Some("a"), &added, false).unwrap());
        assert!(unit.reorder(&*engine, Some("a"), &added, true).unwrap());
        assert_eq!(engine.moves().len(), 2);

        // Topmost layers have no neighbour and forget the last one.
        assert!(!unit.reorder(&*engine, None, &added, false).unwrap());
        assert_eq!(unit.before_id(), None);
    }

    #[tokio::test]
    async fn test_events_bound_and_unbound_symmetrically() {
        let engine = Arc::new(HeadlessEngine::auto_ready());
        let (tx, mut rx) = status_channel();
        let mut unit = LayerUnit::new(
            LayerDescriptor::new("parks", LayerType::Fill)
                .on(LayerEventType::Click, |_| {})
                .on(LayerEventType::MouseEnter, |_| {}),
        );

        // Nothing is bound before the layer exists.
        unit.sync_events(&*engine);
        assert_eq!(engine.listener_count("parks"), 0);

        unit.register(engine.clone(), tx.clone());
        next_status(&mut rx).await;
        unit.sync_events(&*engine);
        unit.sync_events(&*engine);
        assert_eq!(engine.listener_count("parks"), 2);
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::On { .. })),
            2
        );

        unit.teardown(&*engine, &tx).unwrap();
        assert_eq!(engine.listener_count("parks"), 0);
        assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::Off { .. })),
            2
        );
    }
}
