//! Reactive Mounting
//!
//! [`mount_reactive`] connects the two halves of the crate: a view closure
//! runs inside an effect, so every reactive read it makes is tracked, and
//! each re-run reconciles the new tree against the previous one.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use super::host::HostOps;
use super::renderer::Renderer;
use super::vnode::VNode;
use crate::reactive::{Effect, EffectOptions, Flush, Runtime};

type Tree<N> = Arc<Mutex<Option<VNode<N>>>>;

/// A view mounted by [`mount_reactive`].
pub struct MountHandle<O: HostOps> {
    effect: Effect<()>,
    tree: Tree<O::Node>,
    renderer: Arc<Mutex<Renderer<O>>>,
    container: O::Node,
}

/// Render `view` into `container` now and again whenever its reads change.
///
/// With [`Flush::Sync`] the re-render happens inside the write that caused
/// it. With [`Flush::Post`] re-renders are queued and run once at the next
/// [`Runtime::flush_jobs`], however many writes came before.
///
/// A render that fails is logged and changes nothing: the previous tree
/// and its output stay, and the next successful render patches from them.
pub fn mount_reactive<O, V>(
    rt: &Runtime,
    renderer: Arc<Mutex<Renderer<O>>>,
    container: O::Node,
    view: V,
    flush: Flush,
) -> MountHandle<O>
where
    O: HostOps + Send + 'static,
    O::Node: Send + Sync + 'static,
    V: Fn() -> VNode<O::Node> + Send + Sync + 'static,
{
    let tree: Tree<O::Node> = Arc::new(Mutex::new(None));

    let work = {
        let tree = Arc::clone(&tree);
        let renderer = Arc::clone(&renderer);
        let container = container.clone();
        move || {
            // Build first; the renderer lock is never held while user code runs.
            let next = view();
            let mut current = tree.lock();
            let mounted = current.is_some();
            match renderer.lock().render(&container, &mut current, Some(next)) {
                Ok(()) => debug!(update = mounted, "rendered view"),
                Err(err) => error!(error = %err, "render failed, keeping previous tree"),
            }
        }
    };

    let options = match flush {
        Flush::Sync => EffectOptions::default(),
        Flush::Post => EffectOptions::queued(rt),
    };

    MountHandle {
        effect: rt.effect_with(work, options),
        tree,
        renderer,
        container,
    }
}

impl<O: HostOps> MountHandle<O> {
    /// Stop re-rendering. The output stays as it is.
    pub fn stop(&self) {
        self.effect.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.effect.is_stopped()
    }

    /// Stop re-rendering and remove the output.
    pub fn unmount(&self) -> Result<(), crate::RenderError> {
        self.effect.stop();
        let mut current = self.tree.lock();
        self.renderer.lock().render(&self.container, &mut current, None)
    }

    /// Snapshot of the tree currently realized, if any.
    pub fn tree(&self) -> Option<VNode<O::Node>> {
        self.tree.lock().clone()
    }

    /// Number of renders so far, the initial one included.
    pub fn render_count(&self) -> usize {
        self.effect.run_count()
    }
}
