//! Shared render services.
//!
//! One [`Services`] is owned by whoever mounts the scheduler and is handed
//! to every render pass. It holds the configuration, the engine slots and
//! the per-node side tables.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::Config;
use crate::copy::CopyButtons;
use crate::diagram::{self, DiagramEngine};
use crate::dom::ContentTree;
use crate::engine::EngineSlot;
use crate::math::{self, MathEngine};
use crate::state::RenderStates;

pub struct Services {
    pub config: Config,
    pub math_engine: EngineSlot<dyn MathEngine>,
    pub diagram_engine: EngineSlot<dyn DiagramEngine>,
    /// Keyed by content root.
    pub math_states: RefCell<RenderStates>,
    /// Keyed by diagram source block.
    pub diagram_states: RefCell<RenderStates>,
    pub copy_buttons: RefCell<CopyButtons>,
}

impl Services {
    /// Services with the given engine slots.
    pub fn new(
        config: Config,
        math_engine: EngineSlot<dyn MathEngine>,
        diagram_engine: EngineSlot<dyn DiagramEngine>,
    ) -> Self {
        Self {
            config,
            math_engine,
            diagram_engine,
            math_states: RefCell::new(RenderStates::new()),
            diagram_states: RefCell::new(RenderStates::new()),
            copy_buttons: RefCell::new(CopyButtons::new()),
        }
    }

    /// Services backed by the engines compiled into this build.
    pub fn with_default_engines(config: Config) -> Self {
        Self::new(
            config,
            EngineSlot::new("math", math::default_loader),
            EngineSlot::new("diagram", diagram::default_loader),
        )
    }

    /// Services with already constructed engines.
    pub fn with_engines(
        config: Config,
        math_engine: Rc<dyn MathEngine>,
        diagram_engine: Rc<dyn DiagramEngine>,
    ) -> Self {
        Self::new(
            config,
            EngineSlot::ready("math", math_engine),
            EngineSlot::ready("diagram", diagram_engine),
        )
    }

    /// Forget all per-node state. Engine caches survive.
    pub fn reset_side_tables(&self) {
        self.math_states.borrow_mut().clear();
        self.diagram_states.borrow_mut().clear();
        self.copy_buttons.borrow_mut().clear();
    }

    /// Evict side-table entries for nodes no longer in the document.
    pub fn evict_detached(&self, tree: &ContentTree) -> usize {
        self.math_states.borrow_mut().evict_detached(tree)
            + self.diagram_states.borrow_mut().evict_detached(tree)
            + self.copy_buttons.borrow_mut().evict_detached(tree)
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .field("math_engine", &self.math_engine)
            .field("diagram_engine", &self.diagram_engine)
            .finish_non_exhaustive()
    }
}
