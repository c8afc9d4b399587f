//! Parasuite E2E
//!
//! Browser sessions and declarative test units for the Parasuite engine:
//! - [`PlaywrightFactory`] opens one Playwright-driven session per execution
//!   context
//! - [`TestSpec`] parses declarative YAML test specs
//! - [`SpecUnit`] runs a spec's steps against its own context's session
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  TestRunner                                                 │
//! │    ├── TestSpec::load_all(dir) -> [TestSpec]                │
//! │    ├── SpecUnit::from_specs(..) -> [TestUnitRef]            │
//! │    └── SuiteRunner (parasuite-common)                       │
//! │          ├── PlaywrightFactory::open -> PlaywrightSession   │
//! │          ├── LogObserver / FailureCaptureObserver           │
//! │          └── SuiteReport -> suite-report.json               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSpec (YAML)                                            │
//! │    ├── name, description, tags, skip                        │
//! │    └── steps: [Step]                                        │
//! │          ├── navigate { url }                               │
//! │          ├── click { selector }                             │
//! │          ├── fill { selector, value }                       │
//! │          ├── wait { selector, state }                       │
//! │          ├── assert { selector, visible?, text?, attr? }    │
//! │          └── screenshot { name, selector? }                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod playwright;
pub mod runner;
pub mod spec;
pub mod unit;

pub use config::E2eConfig;
pub use error::{E2eError, E2eResult};
pub use playwright::{PlaywrightConfig, PlaywrightFactory, PlaywrightSession};
pub use runner::TestRunner;
pub use spec::{TestSpec, TestStep};
pub use unit::SpecUnit;
