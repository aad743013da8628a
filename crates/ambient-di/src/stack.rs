//! Per-thread and per-task scope stacks
//!
//! Every execution thread owns a stack of [`ScopeLayer`]s. Entering a scope
//! pushes the merge of the current top layer and the new bindings; leaving it
//! removes exactly that layer again, whatever way the scope body terminates.
//!
//! ## Stacks
//!
//! - **Thread stack**: a `thread_local!` stack used by synchronous code.
//!   Each frame records the tokio task (if any) that pushed it, and only
//!   frames of the task being polled are visible. Tasks interleaved on one
//!   OS thread (`LocalSet`, `current_thread` runtimes) therefore never see
//!   each other's scopes, and a spawned task starts with an empty context
//!   just like a spawned thread.
//! - **Task stack**: a `tokio::task_local!` stack installed by
//!   [`scope_async`]. While a task stack is installed for the future being
//!   polled it takes precedence over the thread stack. Task-local state
//!   follows the task across thread migrations in work-stealing runtimes.
//!
//! Branches of one task that run concurrently (`join!`, `select!`) share
//! that task's stacks; give each branch its own [`scope_async`] to separate
//! them.
//!
//! [`ScopeGuard`] is `!Send`: a guard cannot be held across an `.await` in a
//! spawned task. Async code opens scopes with [`scope_async`] instead.

use crate::error::{DiError, DiResult};
use crate::layer::{Bindings, ScopeLayer};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::Id as TaskId;

/// Identifies one pushed layer so a guard can find exactly its own entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ScopeId(u64);

impl ScopeId {
	fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

#[derive(Debug)]
struct Frame {
	id: ScopeId,
	/// Task that pushed the frame; `None` outside any tokio task.
	owner: Option<TaskId>,
	layer: ScopeLayer,
}

thread_local! {
	static THREAD_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Scope stack of one [`scope_async`] future, shared with the guards opened on it.
type TaskStack = Arc<Mutex<Vec<Frame>>>;

tokio::task_local! {
	/// Scope stack of the current async task, installed by `scope_async`.
	static TASK_STACK: TaskStack;
}

/// The exact stack a scope was pushed to.
#[derive(Clone)]
enum StackHandle {
	Task(TaskStack),
	Thread,
}

impl fmt::Debug for StackHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StackHandle::Task(_) => f.write_str("Task"),
			StackHandle::Thread => f.write_str("Thread"),
		}
	}
}

// Frames are never dropped while the stack is borrowed or locked: dropping a
// layer can drop a bound value whose own `Drop` reads the scope again.
impl StackHandle {
	/// The stack that currently defines the effective context.
	fn active() -> Self {
		TASK_STACK
			.try_with(Arc::clone)
			.map(StackHandle::Task)
			.unwrap_or(StackHandle::Thread)
	}

	fn top_layer(&self) -> DiResult<ScopeLayer> {
		match self {
			StackHandle::Task(stack) => Ok(top_of(&lock(stack), None)),
			StackHandle::Thread => {
				let owner = tokio::task::try_id();
				THREAD_STACK
					.try_with(|stack| top_of(&stack.borrow(), owner))
					.map_err(|_| DiError::ContextUnavailable)
			}
		}
	}

	fn depth(&self) -> DiResult<usize> {
		match self {
			StackHandle::Task(stack) => Ok(depth_of(&lock(stack), None)),
			StackHandle::Thread => {
				let owner = tokio::task::try_id();
				THREAD_STACK
					.try_with(|stack| depth_of(&stack.borrow(), owner))
					.map_err(|_| DiError::ContextUnavailable)
			}
		}
	}

	/// Pushes `bindings` merged over the current top layer, returning the new depth.
	fn push(&self, id: ScopeId, bindings: Bindings) -> DiResult<usize> {
		match self {
			StackHandle::Task(stack) => {
				let layer = self.top_layer()?.merge(bindings);
				let mut frames = lock(stack);
				frames.push(Frame {
					id,
					owner: None,
					layer,
				});
				Ok(depth_of(&frames, None))
			}
			StackHandle::Thread => {
				let owner = tokio::task::try_id();
				let layer = self.top_layer()?.merge(bindings);
				THREAD_STACK
					.try_with(|stack| {
						let mut frames = stack.borrow_mut();
						frames.push(Frame { id, owner, layer });
						depth_of(&frames, owner)
					})
					.map_err(|_| DiError::ContextUnavailable)
			}
		}
	}

	/// Detaches the frame `id` and every frame its owner pushed after it.
	fn take(&self, id: ScopeId) -> DiResult<Vec<Frame>> {
		match self {
			StackHandle::Task(stack) => Ok(take_scope(&mut lock(stack), id)),
			StackHandle::Thread => THREAD_STACK
				.try_with(|stack| take_scope(&mut stack.borrow_mut(), id))
				.map_err(|_| DiError::ContextUnavailable),
		}
	}
}

fn lock(stack: &Mutex<Vec<Frame>>) -> MutexGuard<'_, Vec<Frame>> {
	stack.lock().unwrap_or_else(PoisonError::into_inner)
}

fn top_of(frames: &[Frame], owner: Option<TaskId>) -> ScopeLayer {
	frames
		.iter()
		.rev()
		.find(|frame| frame.owner == owner)
		.map(|frame| frame.layer.clone())
		.unwrap_or_default()
}

fn depth_of(frames: &[Frame], owner: Option<TaskId>) -> usize {
	frames.iter().filter(|frame| frame.owner == owner).count()
}

fn take_scope(frames: &mut Vec<Frame>, id: ScopeId) -> Vec<Frame> {
	let Some(pos) = frames.iter().rposition(|frame| frame.id == id) else {
		return Vec::new();
	};
	let owner = frames[pos].owner;
	let mut removed = Vec::new();
	let mut i = pos;
	while i < frames.len() {
		if frames[i].owner == owner {
			removed.push(frames.remove(i));
		} else {
			i += 1;
		}
	}
	removed
}

#[track_caller]
fn fatal(err: DiError) -> ! {
	panic!("{}", err)
}

/// Returns the effective context of the calling thread or task.
///
/// This is the top layer of the active stack, or an empty layer when no
/// scope is open.
///
/// # Examples
///
/// ```
/// use ambient_di::{Bindings, current_context, scope};
///
/// assert!(current_context().unwrap().is_empty());
///
/// scope(Bindings::new().bind("answer", 42i32), || {
/// 	let ctx = current_context().unwrap();
/// 	assert_eq!(ctx.get_as::<i32>("answer"), Some(&42));
/// });
/// ```
pub fn current_context() -> DiResult<ScopeLayer> {
	StackHandle::active().top_layer()
}

/// Number of scopes open on the active stack for the calling thread or task.
///
/// Fails with [`DiError::ContextUnavailable`] when the stack cannot be
/// accessed.
pub fn scope_depth() -> DiResult<usize> {
	StackHandle::active().depth()
}

/// Opens a nested scope, returning the guard that closes it.
///
/// # Panics
///
/// Panics if the scope stack of the current thread cannot be accessed
/// (thread-local storage already torn down). Use [`try_enter_scope`] to
/// observe that condition as an error.
///
/// # Examples
///
/// ```
/// use ambient_di::{Bindings, current_context, enter_scope};
///
/// {
/// 	let _outer = enter_scope(Bindings::new().bind("a", 1i32));
/// 	{
/// 		let _inner = enter_scope(Bindings::new().bind("a", 2i32));
/// 		assert_eq!(current_context().unwrap().get_as::<i32>("a"), Some(&2));
/// 	}
/// 	assert_eq!(current_context().unwrap().get_as::<i32>("a"), Some(&1));
/// }
/// assert!(current_context().unwrap().is_empty());
/// ```
#[track_caller]
pub fn enter_scope(bindings: Bindings) -> ScopeGuard {
	try_enter_scope(bindings).unwrap_or_else(|err| fatal(err))
}

/// Fallible variant of [`enter_scope`].
pub fn try_enter_scope(bindings: Bindings) -> DiResult<ScopeGuard> {
	let stack = StackHandle::active();
	let id = ScopeId::next();
	tracing::trace!(stack = ?stack, bindings = ?bindings, "entering dependency scope");
	let depth = stack.push(id, bindings)?;
	tracing::trace!(depth, "entered dependency scope");

	Ok(ScopeGuard {
		stack,
		id,
		depth,
		_not_send: PhantomData,
	})
}

/// Runs `f` inside a nested scope.
///
/// The scope is closed when `f` returns or unwinds.
///
/// # Examples
///
/// ```
/// use ambient_di::{Bindings, current_context, scope};
///
/// let seen = scope(Bindings::new().bind("user", "ada".to_string()), || {
/// 	current_context().unwrap().get_as::<String>("user").cloned()
/// });
/// assert_eq!(seen.as_deref(), Some("ada"));
/// ```
#[track_caller]
pub fn scope<R>(bindings: Bindings, f: impl FnOnce() -> R) -> R {
	let _guard = enter_scope(bindings);
	f()
}

/// Runs `future` inside a nested scope with its own task-local stack.
///
/// The new layer merges `bindings` over the context that is effective when
/// the returned future is first polled. The scope stays attached to the
/// future for its whole lifetime and disappears with it, whether it
/// completes, fails or is dropped before completion.
///
/// # Panics
///
/// Panics on first poll if the scope stack cannot be accessed; see
/// [`try_scope_async`].
///
/// # Examples
///
/// ```
/// use ambient_di::{Bindings, current_context, scope_async};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let region = scope_async(Bindings::new().bind("region", "eu"), async {
/// 	tokio::task::yield_now().await;
/// 	current_context().unwrap().get_as::<&str>("region").copied()
/// })
/// .await;
/// assert_eq!(region, Some("eu"));
/// # }
/// ```
pub async fn scope_async<F: Future>(bindings: Bindings, future: F) -> F::Output {
	match try_scope_async(bindings, future).await {
		Ok(output) => output,
		Err(err) => fatal(err),
	}
}

/// Fallible variant of [`scope_async`].
pub async fn try_scope_async<F: Future>(bindings: Bindings, future: F) -> DiResult<F::Output> {
	let base = current_context()?;
	tracing::trace!(bindings = ?bindings, "entering task dependency scope");
	let frame = Frame {
		id: ScopeId::next(),
		owner: None,
		layer: base.merge(bindings),
	};
	let stack: TaskStack = Arc::new(Mutex::new(vec![frame]));
	Ok(TASK_STACK.scope(stack, future).await)
}

/// RAII guard for one open scope.
///
/// Dropping the guard removes the layer it pushed from the stack it was
/// pushed to and restores the previous effective context. This holds even
/// when the guard is dropped while another stack is active, e.g. inside a
/// nested [`scope_async`] future.
#[must_use = "the scope closes as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopeGuard {
	stack: StackHandle,
	id: ScopeId,
	depth: usize,
	_not_send: PhantomData<*const ()>,
}

impl ScopeGuard {
	/// Depth of the stack right after this guard's layer was pushed.
	pub fn depth(&self) -> usize {
		self.depth
	}
}

impl Drop for ScopeGuard {
	fn drop(&mut self) {
		let removed = match self.stack.take(self.id) {
			Ok(removed) => removed,
			// Thread-local storage is gone; there is no stack left to restore.
			Err(_) => return,
		};

		match removed.len() {
			0 => {
				tracing::warn!(
					depth = self.depth,
					"dependency scope already removed from its stack"
				);
			}
			1 => {
				tracing::trace!(depth = self.depth, "left dependency scope");
			}
			n => {
				tracing::warn!(
					depth = self.depth,
					discarded = n - 1,
					"dependency scope closed while inner scopes were still open; inner scopes discarded"
				);
			}
		}

		// Bound values may be dropped here, after the stack is released.
		drop(removed);
	}
}
