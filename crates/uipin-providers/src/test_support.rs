//! Shared builders for adapter tests.

use crate::adapter::ProviderTaskInput;
use chrono::Utc;
use std::collections::HashMap;
use uipin_core::{
    BoundingBox, ElementDescriptor, SessionId, TaskId, UiChangePacket, Viewport,
};

pub fn fixture_packet(test_id: &str) -> UiChangePacket {
    UiChangePacket {
        id: "pkt-1".to_string(),
        timestamp: Utc::now(),
        url: "http://localhost:3000/".to_string(),
        viewport: Viewport {
            width: 1280,
            height: 720,
        },
        element: ElementDescriptor {
            tag: "button".to_string(),
            role: Some("button".to_string()),
            text: Some("Save".to_string()),
            attributes: HashMap::from([(
                "data-testid".to_string(),
                Some(test_id.to_string()),
            )]),
            bounding_box: BoundingBox {
                x: 10.0,
                y: 20.0,
                width: 80.0,
                height: 32.0,
            },
        },
        nearby_text: vec![],
        dom_snippet: "<button>Save</button>".to_string(),
        computed_style_summary: HashMap::new(),
        screenshot_path: ".uipin/screenshots/t1.png".to_string(),
        user_request: "Make it green".to_string(),
    }
}

pub fn fixture_input(test_id: &str, dry_run: bool) -> ProviderTaskInput {
    ProviderTaskInput {
        task_id: TaskId::new("t1"),
        session_id: SessionId::new("s1"),
        packet: fixture_packet(test_id),
        prompt: "Make it green".to_string(),
        model: "gpt-5.3-codex-spark".to_string(),
        dry_run,
        debug: false,
        cwd: std::env::temp_dir(),
        timeout_ms: 5_000,
    }
}
