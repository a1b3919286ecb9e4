//! Mock display setups shared by the integration tests.

use dprof::config::{EngineConfig, UnmatchedAdapterPolicy};
use dprof::engine::DisplayEngine;
use dprof::platform::mock::{MockDisplay, MockPlatform, MockPlatformBuilder};
use dprof::snapshot::AdapterId;

pub const NVIDIA: AdapterId = AdapterId(0x0000_0001_0000_c2d1);
pub const RADEON: AdapterId = AdapterId(0x0000_0001_0000_c7e4);

pub const NVIDIA_PATH: &str = r"\\?\PCI#VEN_10DE&DEV_2684&SUBSYS_16F310DE&REV_A1#4&1a2f5c3b&0&0019#{5b45201d-f2f2-4f3b-85bb-30ff1f953599}";
pub const RADEON_PATH: &str = r"\\?\PCI#VEN_1002&DEV_744C&SUBSYS_0E3B1002&REV_C8#6&3c7a1e2f&0&0008#{5b45201d-f2f2-4f3b-85bb-30ff1f953599}";

/// Engine over a mock with no settle delay.
pub fn engine(mock: MockPlatform) -> DisplayEngine<MockPlatform> {
    DisplayEngine::new(mock, quick_config())
}

pub fn quick_config() -> EngineConfig {
    EngineConfig {
        settle_delay_ms: 0,
        ..EngineConfig::default()
    }
}

pub fn refusing_config() -> EngineConfig {
    EngineConfig {
        unmatched_adapter: UnmatchedAdapterPolicy::Refuse,
        ..quick_config()
    }
}

/// Two monitors, one per GPU; the right one is HDR capable and enabled.
pub fn dual_gpu() -> MockPlatform {
    MockPlatformBuilder::new()
        .adapter(NVIDIA, NVIDIA_PATH)
        .adapter(RADEON, RADEON_PATH)
        .display(
            MockDisplay::new(NVIDIA, 0, 4353)
                .gdi_name(r"\\.\DISPLAY1")
                .friendly_name("DELL U2720Q")
                .resolution(3840, 2160),
        )
        .display(
            MockDisplay::new(RADEON, 0, 8448)
                .gdi_name(r"\\.\DISPLAY2")
                .friendly_name("LG OLED")
                .at(3840, 0)
                .refresh(120)
                .hdr(true),
        )
        .taskbar_option("TaskbarSmallIcons", 0)
        .build()
}

/// One GPU driving an independent monitor plus a two-way clone group.
pub fn cloned_trio() -> MockPlatform {
    MockPlatformBuilder::new()
        .adapter(NVIDIA, NVIDIA_PATH)
        .display(MockDisplay::new(NVIDIA, 0, 100).friendly_name("Desk"))
        .display(MockDisplay::new(NVIDIA, 1, 200).at(1920, 0).friendly_name("Projector"))
        .display(MockDisplay::new(NVIDIA, 1, 300).at(1920, 0).friendly_name("Stage"))
        .build()
}

/// Clone group on the NVIDIA card next to an independent Radeon display.
/// Both cards number their first source 0.
pub fn cross_adapter_clone() -> MockPlatform {
    MockPlatformBuilder::new()
        .adapter(NVIDIA, NVIDIA_PATH)
        .adapter(RADEON, RADEON_PATH)
        .display(
            MockDisplay::new(NVIDIA, 0, 200)
                .gdi_name(r"\\.\DISPLAY1")
                .friendly_name("Projector"),
        )
        .display(
            MockDisplay::new(NVIDIA, 0, 300)
                .gdi_name(r"\\.\DISPLAY1")
                .friendly_name("Stage"),
        )
        .display(
            MockDisplay::new(RADEON, 0, 100)
                .gdi_name(r"\\.\DISPLAY2")
                .at(1920, 0)
                .friendly_name("Desk"),
        )
        .build()
}

/// Single monitor whose taskbar blobs use the given schema version.
pub fn single_with_taskbar_version(version: u32) -> MockPlatform {
    MockPlatformBuilder::new()
        .adapter(NVIDIA, NVIDIA_PATH)
        .display(MockDisplay::new(NVIDIA, 0, 4353))
        .display(MockDisplay::new(NVIDIA, 1, 4354).at(1920, 0))
        .stuck_rect_version(version)
        .build()
}
