use std::collections::VecDeque;
use std::panic::{ self, AssertUnwindSafe };
use std::sync::{ Arc, Condvar, Mutex, MutexGuard, PoisonError };
use std::thread;
use std::time::{ Duration, Instant };

use log::{ debug, error, info, trace };

use crate::world::World;
use crate::camera::Camera;
use crate::canvas::{ Canvas, Framebuffer, FrameSink };
use crate::config::RenderConfig;
use crate::task::RayTask;
use crate::error::RenderError;

pub enum Message {
    Trace(RayTask),
    Terminate,
}

#[derive(Default)]
struct QueueState {
    messages: VecDeque<Message>,

    /// Tasks taken off the queue and not yet finished.
    busy: usize,

    /// Workers blocked in `pop`.
    waiting: usize,

    /// Tasks which have run to completion.
    completed: usize,

    paused: bool,
}

impl QueueState {
    fn pending(&self) -> usize {
        self.messages.iter()
            .filter(|m| matches!(m, Message::Trace(_)))
            .count()
    }

    fn is_idle(&self) -> bool {
        self.busy == 0 && self.pending() == 0
    }
}

/// A blocking FIFO of ray tasks shared by the render workers.
///
/// Workers `pop` a task, trace one bounce, and hand it back with `finish`:
/// live tasks go back on the end of the queue, so every pixel makes
/// progress at roughly the same rate. The queue tracks how many tasks are
/// in a worker's hands, which lets the driver tell when rendering is done.
#[derive(Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,

    /// Signalled when a message is pushed or the queue resumes.
    available: Condvar,

    /// Signalled when a task finishes or a worker starts waiting.
    changed: Condvar,
}

impl TaskQueue {
    pub fn new() -> TaskQueue {
        Default::default()
    }

    // A worker which panicked mid-task never holds the lock, so whatever
    // it left behind is still consistent.
    fn lock(&self) -> MutexGuard<QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, message: Message) {
        self.lock().messages.push_back(message);
        self.available.notify_one();
    }

    /// Takes the next message, blocking while the queue is empty or paused.
    pub fn pop(&self) -> Message {
        let mut state = self.lock();

        loop {
            if !state.paused {
                if let Some(message) = state.messages.pop_front() {
                    if let Message::Trace(_) = message {
                        state.busy += 1;
                    }

                    return message;
                }
            }

            state.waiting += 1;
            self.changed.notify_all();
            state = self.available.wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            state.waiting -= 1;
        }
    }

    /// Hands a popped task back. A task which should keep going is queued
    /// again; `None` retires it.
    pub fn finish(&self, task: Option<RayTask>) {
        let mut state = self.lock();

        match task {
            Some(task) => {
                state.messages.push_back(Message::Trace(task));
                self.available.notify_one();
            },
            None => state.completed += 1,
        }

        state.busy -= 1;
        self.changed.notify_all();
    }

    /// Whether every task has finished.
    pub fn is_idle(&self) -> bool {
        self.lock().is_idle()
    }

    /// Waits until every task has finished, or until `timeout` passes.
    /// Returns whether the queue is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let state = self.lock();
        if state.is_idle() {
            return true;
        }

        let (state, _) = self.changed.wait_timeout(state, timeout)
            .unwrap_or_else(PoisonError::into_inner);

        state.is_idle()
    }

    /// Stops handing out messages. Workers finish their current bounce and
    /// then block.
    pub fn pause(&self) {
        self.lock().paused = true;
    }

    pub fn resume(&self) {
        self.lock().paused = false;
        self.available.notify_all();
    }

    /// Blocks until at least `workers` workers are waiting for a message.
    pub fn wait_parked(&self, workers: usize) {
        let mut state = self.lock();
        while state.waiting < workers {
            state = self.changed.wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Tasks which are queued or in flight.
    pub fn len(&self) -> usize {
        let state = self.lock();
        state.pending() + state.busy
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tasks which have run to completion.
    pub fn completed(&self) -> usize {
        self.lock().completed
    }
}

/// Everything a worker shares with the rest of the render.
#[derive(Clone)]
struct Shared {
    world: Arc<World>,
    framebuffer: Arc<Framebuffer>,
    queue: Arc<TaskQueue>,
    config: Arc<RenderConfig>,
}

struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, shared: Shared) -> Result<Worker, RenderError> {
        let thread = thread::Builder::new()
            .name(format!("tracer-{}", id))
            .spawn(move || {
                trace!("Worker {} started", id);
                Worker::run(id, &shared);
                trace!("Worker {} stopped", id);
            })
            .map_err(RenderError::Spawn)?;

        Ok(Worker { id, thread: Some(thread) })
    }

    fn run(id: usize, shared: &Shared) {
        loop {
            // Obtain the message being executed.
            let mut task = match shared.queue.pop() {
                Message::Trace(task) => task,

                // Exit the worker thread loop, terminating the thread.
                Message::Terminate => break,
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                task.step(&shared.world, &shared.framebuffer, &shared.config)
            }));

            match outcome {
                Ok(true) => shared.queue.finish(Some(task)),
                Ok(false) => shared.queue.finish(None),
                Err(_) => {
                    error!("Worker {} panicked tracing pixel {}; dropping it",
                        id, task.pixel);
                    shared.queue.finish(None);
                },
            }
        }
    }
}

pub struct ThreadPool {
    workers: Vec<Worker>,
    queue: Arc<TaskQueue>,
}

impl ThreadPool {
    /// Spawns `size` workers pulling from `queue`.
    ///
    /// If a worker can't be spawned, the ones already running are shut down
    /// before the error is returned.
    fn new(size: usize, shared: Shared) -> Result<ThreadPool, RenderError> {
        // There should be at least one thread to run workers.
        let size = size.max(1);

        let mut pool = ThreadPool {
            workers: Vec::with_capacity(size),
            queue: Arc::clone(&shared.queue),
        };

        for id in 0..size {
            pool.workers.push(Worker::new(id, shared.clone())?);
        }

        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn execute(&self, task: RayTask) {
        self.queue.push(Message::Trace(task));
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.queue.resume();

        for _ in &self.workers {
            self.queue.push(Message::Terminate);
        }

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    error!("Worker {} exited abnormally", worker.id);
                }
            }
        }
    }
}

/// Renders a world through a camera on a pool of worker threads.
///
/// One task per pixel is queued, column by column. While the workers run,
/// the framebuffer is copied to `sink` every `preview_interval`, and the
/// sink may pause the workers in between. Once every task has finished, the
/// pool is shut down and the final image is presented and returned.
pub fn render(world: Arc<World>, camera: &Camera, config: &RenderConfig,
    sink: &mut dyn FrameSink) -> Result<Canvas, RenderError> {
    let framebuffer = Arc::new(Framebuffer::new(camera.width(), camera.height()));
    let queue = Arc::new(TaskQueue::new());
    let total = framebuffer.width * framebuffer.height;
    let size = config.worker_count();

    info!("Rendering {}x{} pixels using {} threads...",
        framebuffer.width, framebuffer.height, size);

    let started = Instant::now();
    {
        let pool = ThreadPool::new(size, Shared {
            world,
            framebuffer: Arc::clone(&framebuffer),
            queue: Arc::clone(&queue),
            config: Arc::new(config.clone()),
        })?;

        for (x, y) in camera.pixels() {
            let (col, row) = camera.image_position(x, y);
            let pixel = framebuffer.index(col, row);
            pool.execute(RayTask::new(camera.ray_for_pixel(x, y), pixel));
        }

        while !queue.wait_idle(config.preview_interval) {
            framebuffer.present_to(sink);

            if sink.pause_requested() {
                debug!("Pausing {} workers", pool.size());
                queue.pause();
                queue.wait_parked(pool.size());
                sink.hold();
                queue.resume();
                debug!("Resumed");
            }

            debug!("{} of {} pixels done", queue.completed(), total);
        }
    }

    framebuffer.present_to(sink);
    info!("...done in {:.2?}.", started.elapsed());

    Ok(framebuffer.snapshot())
}

#[cfg(test)]
use crate::tuple::Tuple4D;
#[cfg(test)]
use crate::ray::Ray4D;
#[cfg(test)]
use crate::color::Color;
#[cfg(test)]
use crate::light::{ Light, Material };
#[cfg(test)]
use crate::surface::Surface;

#[test]
fn queue_tracks_busy_tasks() {
    let q = TaskQueue::new();
    let task = RayTask::new(Ray4D::new(
        Tuple4D::point(0.0, 0.0, 0.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    ), 0);

    q.push(Message::Trace(task));
    assert!(!q.is_idle());
    assert_eq!(q.len(), 1);

    let popped = match q.pop() {
        Message::Trace(t) => t,
        Message::Terminate => panic!("expected a task"),
    };

    // In a worker's hands: not queued, but not done either.
    assert!(!q.is_idle());
    q.finish(Some(popped));
    assert_eq!(q.len(), 1);

    let _ = q.pop();
    q.finish(None);
    assert!(q.is_idle());
    assert!(q.wait_idle(Duration::from_millis(1)));
    assert_eq!(q.completed(), 1);
}

#[test]
fn terminate_does_not_count_as_work() {
    let q = TaskQueue::new();
    q.push(Message::Terminate);

    assert!(q.is_idle());
    assert!(matches!(q.pop(), Message::Terminate));
}

#[test]
fn paused_queue_parks_workers() {
    let q = Arc::new(TaskQueue::new());
    q.pause();
    q.push(Message::Terminate);

    let worker = {
        let q = Arc::clone(&q);
        thread::spawn(move || matches!(q.pop(), Message::Terminate))
    };

    // The worker can't take the message until the queue resumes.
    q.wait_parked(1);
    q.resume();

    assert!(worker.join().unwrap());
}

#[test]
fn every_submitted_pixel_completes_once() {
    let mut world = World::empty();
    world.lights.push(Light::point(Color::white(), Tuple4D::point(0.0, 0.0, -10.0)));
    world.surfaces.push(Surface::sphere(0, Tuple4D::point(0.0, 0.0, 0.0), 3.0,
        Arc::new(Material { ks: 0.5, ..Default::default() })));

    let framebuffer = Arc::new(Framebuffer::new(8, 8));
    let queue = Arc::new(TaskQueue::new());
    let pool = ThreadPool::new(4, Shared {
        world: Arc::new(world),
        framebuffer: Arc::clone(&framebuffer),
        queue: Arc::clone(&queue),
        config: Arc::new(RenderConfig::default()),
    }).unwrap();
    assert_eq!(pool.size(), 4);

    for pixel in 0..64 {
        let (x, y) = ((pixel % 8) as f64 - 3.5, (pixel / 8) as f64 - 3.5);
        pool.execute(RayTask::new(Ray4D::new(
            Tuple4D::point(x, y, -10.0),
            Tuple4D::vector(0.0, 0.0, 1.0),
        ), pixel));
    }

    while !queue.wait_idle(Duration::from_millis(10)) {}

    assert_eq!(queue.completed(), 64);
    assert!(queue.is_empty());
    drop(pool);
}
