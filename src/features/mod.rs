//! Feature blocks, layered per hardware generation
//!
//! Each submodule owns one [`crate::pipeline::FeatureId`] and registers its
//! stage callbacks with the pipeline. Later generations add blocks on top of
//! the base generation's registrations — the base block's identity survives,
//! only the chains it populated gain new top layers.

use crate::caps::Generation;
use crate::pipeline::FeatureBlocks;

pub mod gen11;
pub mod gen12;
pub mod roi;

/// Register every feature block that applies to `generation`
///
/// Registration order matters: base-generation blocks first so that later
/// generations' chain layers end up on top.
pub fn register_for(blocks: &mut FeatureBlocks, generation: Generation) {
    gen11::register(blocks);
    if generation >= Generation::Gen12 {
        gen12::register(blocks);
    }
    roi::register(blocks);
}
