//! Parallel SDF oracle (spec §4.4): N worker threads each holding an
//! independent oracle, an idle-worker stack, an overflow task FIFO, and a
//! main-thread dispatcher.
//!
//! Not used by `FontAtlas`'s on-demand deferred batch — that path stays
//! single-threaded to keep atlas-write serialization trivial (spec §4.4).
//! Used by bulk/offline generation such as the BMFont-style batch stitcher
//! (see `bmfont.rs`).
//!
//! Threading model grounded on `ori_term::tab::spawn_reader_thread` (spawn +
//! channel/event-proxy) and `Motioner::canvas::preview_worker` (mpsc
//! job/result channel pair around a background thread); `parking_lot::Mutex`
//! guards the dispatcher's shared idle-stack/overflow-FIFO/worker-handle
//! state, matching `ori_term`'s use of `parking_lot` for hot shared state.

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::error::AtlasError;
use crate::glyph::CodePoint;
use crate::oracle::{OracleGlyph, SdfOracle, VariationAxis};

/// Which oracle entry point a task should call.
#[derive(Clone)]
pub enum GenerateKind {
    Msdf,
    Mtsdf,
    MtsdfVar(Vec<VariationAxis>),
}

struct TaskMsg {
    id: u64,
    cp: CodePoint,
    font_size: u32,
    pixel_range: f32,
    kind: GenerateKind,
}

enum WorkerMsg {
    Task(TaskMsg),
    Dispose,
}

enum WorkerEvent {
    /// Worker `i` is ready to accept work — sent once after successful init,
    /// and again after a successful respawn following a mid-task error.
    Ready(usize),
    InitFailed(usize, String),
    TaskDone {
        worker_id: usize,
        task_id: u64,
        output: Result<Option<OracleGlyph>, String>,
    },
    Disposed(usize),
}

/// N worker threads, each with its own `SdfOracle`, dispatched by an
/// idle-stack + overflow-FIFO scheduler living on the calling thread.
pub struct WorkerPool<O: SdfOracle> {
    factory: Arc<dyn Fn() -> O + Send + Sync>,
    font_bundle: Arc<Vec<u8>>,
    events_tx: Sender<WorkerEvent>,
    events_rx: Mutex<Receiver<WorkerEvent>>,
    state: Mutex<PoolState>,
    disposed: Mutex<bool>,
}

#[derive(Default)]
struct PoolState {
    task_txs: Vec<Option<Sender<WorkerMsg>>>,
    handles: Vec<Option<JoinHandle<()>>>,
    idle: Vec<usize>,
    overflow: VecDeque<TaskMsg>,
    next_task_id: u64,
}

impl<O: SdfOracle> WorkerPool<O> {
    /// Spawn `num_workers` workers, send each an init message carrying
    /// `font_bundle`, and block until every worker replies `ready` (or one
    /// replies with an init error, which rejects the whole pool).
    pub fn new(
        num_workers: usize,
        font_bundle: Arc<Vec<u8>>,
        factory: impl Fn() -> O + Send + Sync + 'static,
    ) -> Result<Self, AtlasError> {
        let factory: Arc<dyn Fn() -> O + Send + Sync> = Arc::new(factory);
        let (events_tx, events_rx) = mpsc::channel();

        let mut state = PoolState::default();
        for i in 0..num_workers {
            let (tx, handle) = spawn_worker(i, factory.clone(), font_bundle.clone(), events_tx.clone());
            state.task_txs.push(Some(tx));
            state.handles.push(Some(handle));
        }

        let pool = Self {
            factory,
            font_bundle,
            events_tx,
            events_rx: Mutex::new(events_rx),
            state: Mutex::new(state),
            disposed: Mutex::new(false),
        };

        // Ready gate: collect one Ready/InitFailed per worker before
        // returning. Any InitFailed rejects the whole pool.
        let mut failure: Option<AtlasError> = None;
        for _ in 0..num_workers {
            let event = pool.events_rx.lock().recv();
            match event {
                Ok(WorkerEvent::Ready(i)) => pool.state.lock().idle.push(i),
                Ok(WorkerEvent::InitFailed(i, reason)) => {
                    if failure.is_none() {
                        failure = Some(AtlasError::WorkerInitFailure { worker_id: i, reason });
                    }
                }
                _ => {}
            }
        }

        if let Some(err) = failure {
            pool.dispose();
            return Err(err);
        }

        Ok(pool)
    }

    /// Convenience constructor reading worker count from a
    /// [`crate::config::WorkerPoolConfig`].
    pub fn from_config(
        config: crate::config::WorkerPoolConfig,
        font_bundle: Arc<Vec<u8>>,
        factory: impl Fn() -> O + Send + Sync + 'static,
    ) -> Result<Self, AtlasError> {
        Self::new(config.num_workers, font_bundle, factory)
    }

    /// Generate one glyph. The pool is always ready once `new` returns; this
    /// either dispatches immediately to an idle worker or queues on the
    /// overflow FIFO until one frees up.
    pub fn generate_glyph(
        &self,
        cp: CodePoint,
        font_size: u32,
        pixel_range: f32,
        kind: GenerateKind,
    ) -> Result<Option<OracleGlyph>, AtlasError> {
        let mut results = self.dispatch_and_collect(vec![(cp, font_size, pixel_range, kind)])?;
        results.pop().expect("exactly one request")
    }

    /// Generate a batch. Results come back in *input order* — each request
    /// is tracked independently by task id, regardless of which worker or
    /// in what completion order it finishes.
    pub fn generate_batch(
        &self,
        chars: &[CodePoint],
        font_size: u32,
        pixel_range: f32,
        kind: GenerateKind,
    ) -> Result<Vec<Result<Option<OracleGlyph>, AtlasError>>, AtlasError> {
        let requests = chars
            .iter()
            .map(|&cp| (cp, font_size, pixel_range, kind.clone()))
            .collect();
        self.dispatch_and_collect(requests)
    }

    fn dispatch_and_collect(
        &self,
        requests: Vec<(CodePoint, u32, f32, GenerateKind)>,
    ) -> Result<Vec<Result<Option<OracleGlyph>, AtlasError>>, AtlasError> {
        if *self.disposed.lock() {
            return Err(AtlasError::PoolDisposed);
        }

        let n = requests.len();
        let mut slots: Vec<Option<Result<Option<OracleGlyph>, AtlasError>>> = (0..n).map(|_| None).collect();
        let mut id_to_slot = HashMap::with_capacity(n);
        let mut id_to_cp = HashMap::with_capacity(n);

        {
            let mut state = self.state.lock();
            for (slot, (cp, font_size, pixel_range, kind)) in requests.into_iter().enumerate() {
                let id = state.next_task_id;
                state.next_task_id += 1;
                id_to_slot.insert(id, slot);
                id_to_cp.insert(id, cp);
                let task = TaskMsg {
                    id,
                    cp,
                    font_size,
                    pixel_range,
                    kind,
                };
                dispatch_one(&mut state, task);
            }
        }

        let mut remaining = n;
        while remaining > 0 {
            let event = self
                .events_rx
                .lock()
                .recv()
                .expect("worker threads outlive the pool");
            match event {
                WorkerEvent::Ready(i) => {
                    let mut state = self.state.lock();
                    requeue_worker(&mut state, i);
                }
                WorkerEvent::TaskDone {
                    worker_id,
                    task_id,
                    output,
                } => {
                    let failed = output.is_err();
                    if let Some(&slot) = id_to_slot.get(&task_id) {
                        let cp = id_to_cp.get(&task_id).copied().unwrap_or(0);
                        slots[slot] = Some(output.map_err(|reason| AtlasError::WorkerTaskFailed {
                            worker_id,
                            cp,
                            reason,
                        }));
                        remaining -= 1;
                    }
                    if failed {
                        // The worker thread has already exited; bring up a
                        // replacement instead of returning it to idle.
                        self.respawn(worker_id);
                    } else {
                        let mut state = self.state.lock();
                        requeue_worker(&mut state, worker_id);
                    }
                }
                WorkerEvent::InitFailed(i, reason) => {
                    // A respawn after a mid-task failure can itself fail;
                    // the worker is left out of the idle stack permanently.
                    log::error!("worker {i} failed to respawn: {reason}");
                }
                WorkerEvent::Disposed(_) => {}
            }
        }

        Ok(slots.into_iter().map(|s| s.expect("every slot filled")).collect())
    }

    /// Bring up a fresh oracle instance on worker slot `i` after a mid-task
    /// failure. The replaced thread sends `Ready(i)` on its own, handled the
    /// same way as initial readiness: rejoin the idle stack or pick up
    /// overflow work.
    fn respawn(&self, i: usize) {
        let (tx, handle) = spawn_worker(i, self.factory.clone(), self.font_bundle.clone(), self.events_tx.clone());
        let mut state = self.state.lock();
        state.task_txs[i] = Some(tx);
        state.handles[i] = Some(handle);
    }

    /// Tear down every worker: send `dispose`, await `disposed`, join.
    /// The pool is unusable afterwards. Idempotent.
    pub fn dispose(&self) {
        let mut disposed = self.disposed.lock();
        if *disposed {
            return;
        }
        *disposed = true;
        drop(disposed);

        let mut live = 0;
        {
            let state = self.state.lock();
            for tx in state.task_txs.iter().flatten() {
                let _ = tx.send(WorkerMsg::Dispose);
                live += 1;
            }
        }

        let mut done = 0;
        while done < live {
            match self.events_rx.lock().recv() {
                Ok(WorkerEvent::Disposed(_)) => done += 1,
                Ok(_) => {}
                Err(_) => break,
            }
        }

        let handles: Vec<_> = self.state.lock().handles.iter_mut().filter_map(Option::take).collect();
        for handle in handles {
            let _ = handle.join();
        }
    }

    pub fn is_disposed(&self) -> bool {
        *self.disposed.lock()
    }
}

/// Pop an idle worker and send it `task`, or push to overflow if none are
/// idle.
fn dispatch_one(state: &mut PoolState, task: TaskMsg) {
    if let Some(i) = state.idle.pop() {
        send_task(state, i, task);
    } else {
        state.overflow.push_back(task);
    }
}

fn send_task(state: &PoolState, worker: usize, task: TaskMsg) {
    if let Some(Some(tx)) = state.task_txs.get(worker) {
        let _ = tx.send(WorkerMsg::Task(task));
    }
}

/// A worker finished (or just came up via init/respawn): dispatch its next
/// overflow task, or return it to the idle stack.
fn requeue_worker(state: &mut PoolState, worker: usize) {
    if let Some(task) = state.overflow.pop_front() {
        send_task(state, worker, task);
    } else {
        state.idle.push(worker);
    }
}

impl<O: SdfOracle> Drop for WorkerPool<O> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Spawn one worker thread: build its oracle via `factory` (catching panics
/// so a bad font/oracle construction reports `InitFailed` rather than
/// poisoning the pool), load the font bundle, signal `Ready`, then loop
/// handling tasks until `Dispose`.
fn spawn_worker<O: SdfOracle>(
    i: usize,
    factory: Arc<dyn Fn() -> O + Send + Sync>,
    font_bundle: Arc<Vec<u8>>,
    events_tx: Sender<WorkerEvent>,
) -> (Sender<WorkerMsg>, JoinHandle<()>) {
    let (task_tx, task_rx) = mpsc::channel::<WorkerMsg>();

    let handle = std::thread::Builder::new()
        .name(format!("sdf-worker-{i}"))
        .spawn(move || {
            let built = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let mut oracle = factory();
                oracle.load_font(&font_bundle);
                oracle
            }));

            let mut oracle = match built {
                Ok(oracle) => oracle,
                Err(payload) => {
                    let _ = events_tx.send(WorkerEvent::InitFailed(i, panic_message(&payload)));
                    return;
                }
            };

            let _ = events_tx.send(WorkerEvent::Ready(i));

            for msg in task_rx {
                match msg {
                    WorkerMsg::Task(task) => {
                        let task_id = task.id;
                        let result =
                            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| run_task(&mut oracle, &task)));
                        let output = result.map_err(|payload| panic_message(&payload));
                        let is_err = output.is_err();
                        let _ = events_tx.send(WorkerEvent::TaskDone {
                            worker_id: i,
                            task_id,
                            output,
                        });
                        if is_err {
                            // The oracle may be left in a bad state after a
                            // panic; this thread exits and the dispatcher
                            // respawns the slot.
                            return;
                        }
                    }
                    WorkerMsg::Dispose => {
                        let _ = events_tx.send(WorkerEvent::Disposed(i));
                        return;
                    }
                }
            }
        })
        .expect("failed to spawn SDF worker thread");

    (task_tx, handle)
}

fn run_task<O: SdfOracle>(oracle: &mut O, task: &TaskMsg) -> Option<OracleGlyph> {
    if !oracle.has_glyph(task.cp) {
        return None;
    }
    match &task.kind {
        GenerateKind::Msdf => oracle.generate(task.cp, task.font_size, task.pixel_range),
        GenerateKind::Mtsdf => oracle.generate_mtsdf(task.cp, task.font_size, task.pixel_range),
        GenerateKind::MtsdfVar(axes) => oracle.generate_mtsdf_var(task.cp, task.font_size, task.pixel_range, axes),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSdfOracle;

    fn pool(num_workers: usize) -> WorkerPool<FakeSdfOracle> {
        WorkerPool::new(num_workers, Arc::new(vec![1, 2, 3]), FakeSdfOracle::default).unwrap()
    }

    #[test]
    fn s6_batch_returns_in_input_order_with_four_workers() {
        let p = pool(4);
        let chars: Vec<CodePoint> = (65..=72).collect();
        let results = p.generate_batch(&chars, 32, 4.0, GenerateKind::Mtsdf).unwrap();
        assert_eq!(results.len(), 8);
        for (cp, r) in chars.iter().zip(results.iter()) {
            let glyph = r.as_ref().unwrap().as_ref().unwrap_or_else(|| panic!("cp {cp} should render"));
            assert!(glyph.metrics.width > 0);
            assert!(glyph.metrics.height > 0);
        }
    }

    #[test]
    fn s6_single_worker_matches_metrics_of_four_workers() {
        let chars: Vec<CodePoint> = (65..=72).collect();
        let p4 = pool(4);
        let p1 = pool(1);
        let r4 = p4.generate_batch(&chars, 32, 4.0, GenerateKind::Mtsdf).unwrap();
        let r1 = p1.generate_batch(&chars, 32, 4.0, GenerateKind::Mtsdf).unwrap();
        for (a, b) in r4.iter().zip(r1.iter()) {
            let ga = a.as_ref().unwrap().as_ref().unwrap();
            let gb = b.as_ref().unwrap().as_ref().unwrap();
            assert_eq!(ga.metrics.width, gb.metrics.width);
            assert_eq!(ga.metrics.height, gb.metrics.height);
        }
    }

    #[test]
    fn generate_glyph_single_request() {
        let p = pool(2);
        let result = p.generate_glyph('A' as u32, 32, 4.0, GenerateKind::Mtsdf).unwrap();
        assert!(result.is_some());
    }

    #[test]
    fn missing_glyph_yields_none_not_error() {
        let p = WorkerPool::new(1, Arc::new(vec![]), || FakeSdfOracle {
            missing: [0x1F600].into_iter().collect(),
            ..FakeSdfOracle::default()
        })
        .unwrap();
        let result = p.generate_glyph(0x1F600, 32, 4.0, GenerateKind::Mtsdf).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn dispose_is_idempotent() {
        let p = pool(2);
        p.dispose();
        p.dispose();
        assert!(p.is_disposed());
    }

    #[test]
    fn dispatch_after_dispose_errors() {
        let p = pool(1);
        p.dispose();
        let err = p.generate_glyph('A' as u32, 32, 4.0, GenerateKind::Mtsdf).unwrap_err();
        assert!(matches!(err, AtlasError::PoolDisposed));
    }
}
