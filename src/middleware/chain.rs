// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::traits::Handler;

/// A cross-cutting behaviour that wraps a handler.
///
/// A layer may decline to wrap (returning `inner` unchanged) when the
/// behaviour it provides is switched off for the vertex.
pub trait Layer: Send {
    fn wrap(self: Box<Self>, inner: Arc<dyn Handler>) -> Arc<dyn Handler>;
}

/// Builder that composes layers around a core handler.
///
/// Layers are applied in the order they are added: the first added ends up
/// innermost, the last added runs first. [`HandlerChain::build`] consumes the
/// builder, so a composed handler can never be re-wrapped.
pub struct HandlerChain {
    core: Arc<dyn Handler>,
    layers: Vec<Box<dyn Layer>>,
}

impl HandlerChain {
    pub fn new(core: Arc<dyn Handler>) -> Self {
        Self {
            core,
            layers: Vec::new(),
        }
    }

    pub fn layer(mut self, layer: impl Layer + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn build(self) -> Arc<dyn Handler> {
        self.layers
            .into_iter()
            .fold(self.core, |inner, layer| layer.wrap(inner))
    }
}
