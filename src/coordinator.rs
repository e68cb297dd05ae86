//! Backend selection and tray event routing.

use std::rc::Rc;

use remote_tray_core::{
    ClientCapabilities, MouseButton, TrayAttributes, TrayBackend, TrayEvent, TrayGeometry,
    TrayMenu, TrayProxy, tray_id::TrayId,
};
use tracing::{debug, error, info, warn};
use winit::event::{ElementState, WindowEvent};
use winit::window::WindowId;

use crate::backend::TrayBackendFactory;
use crate::error::HarnessError;
use crate::menu_helper::{MenuHelper, MenuHelperFactory};
use crate::scheduler::DeferredQueue;

/// Lifecycle of a [`TrayCoordinator`]. `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Uninitialized,
    MenuBuilt,
    BackendAttached,
    Running,
    Terminated,
}

/// Menu calls queued by click events. They run from [`TrayCoordinator::run_deferred`], never from
/// inside the backend's own dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    Activate { button: MouseButton, time: u32 },
    Popup { button: MouseButton, time: u32 },
}

/// What handling a tray event led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Logged or answered in place.
    Handled,
    /// A [`DeferredAction`] was queued.
    Scheduled,
    /// Shutdown was requested; the caller should stop its event loop.
    Exit,
    /// Not acted upon: no policy matches, the event came from a stale handle, or we are terminated.
    Ignored,
}

/// The candidate lists a coordinator picks from, in priority order.
#[derive(Debug, Default)]
pub struct Candidates<'a> {
    pub menu_helpers: Vec<MenuHelperFactory<'a>>,
    pub backends: Vec<TrayBackendFactory<'a>>,
    /// Only try the backend with this name.
    pub forced_backend: Option<String>,
}

pub struct TrayCoordinator {
    state: CoordinatorState,
    menu_helper: Box<dyn MenuHelper>,
    menu: Rc<TrayMenu>,
    tray: Box<dyn TrayBackend>,
    deferred: DeferredQueue<DeferredAction>,
}

impl std::fmt::Debug for TrayCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrayCoordinator")
            .field("state", &self.state)
            .field("menu_helper", &self.menu_helper.name())
            .field("tray", &self.tray)
            .field("deferred", &self.deferred.len())
            .finish()
    }
}

fn transition(from: CoordinatorState, to: CoordinatorState) -> CoordinatorState {
    debug!(?from, ?to, "tray coordinator state change");
    to
}

fn select_menu_helper(
    client: &dyn ClientCapabilities,
    candidates: &[MenuHelperFactory<'_>],
) -> Result<(Box<dyn MenuHelper>, Rc<TrayMenu>), HarnessError> {
    let mut attempted = Vec::new();
    for candidate in candidates {
        if !(candidate.available)() {
            debug!(helper = candidate.name, "menu helper not available on this platform");
            attempted.push(format!("{}: not available", candidate.name));
            continue;
        }
        let built = candidate.construct(client).and_then(|mut helper| {
            let menu = helper.build()?;
            Ok((helper, menu))
        });
        match built {
            Ok(found) => return Ok(found),
            Err(err) => {
                warn!(helper = candidate.name, "failed to create menu helper: {err:#}");
                attempted.push(format!("{}: {err:#}", candidate.name));
            }
        }
    }
    Err(HarnessError::NoMenuHelper { attempted })
}

fn select_backend(
    candidates: &[TrayBackendFactory<'_>],
    forced: Option<&str>,
    attr: &TrayAttributes,
    proxy: &TrayProxy,
) -> Result<Box<dyn TrayBackend>, HarnessError> {
    let mut attempted = Vec::new();
    for candidate in candidates {
        if forced.is_some_and(|name| name != candidate.name) {
            attempted.push(format!("{}: skipped", candidate.name));
            continue;
        }
        if !(candidate.available)() {
            debug!(backend = candidate.name, "tray backend not available on this platform");
            attempted.push(format!("{}: not available", candidate.name));
            continue;
        }
        match candidate.construct(attr, proxy.clone()) {
            Ok(tray) => return Ok(tray),
            Err(err) => {
                warn!(backend = candidate.name, "failed to create tray: {err:#}");
                attempted.push(format!("{}: {err:#}", candidate.name));
            }
        }
    }
    Err(HarnessError::NoTrayBackend { attempted })
}

impl TrayCoordinator {
    /// Build the menu, attach the first tray backend that constructs, and start routing.
    ///
    /// Fails without attaching anything when no menu helper or no backend succeeds.
    pub fn new(
        client: &dyn ClientCapabilities,
        attributes: TrayAttributes,
        candidates: Candidates<'_>,
        proxy: TrayProxy,
    ) -> Result<Self, HarnessError> {
        let mut state = CoordinatorState::Uninitialized;

        let (menu_helper, menu) = select_menu_helper(client, &candidates.menu_helpers)?;
        state = transition(state, CoordinatorState::MenuBuilt);
        info!(helper = menu_helper.name(), entries = menu.entries().len(), "tray menu built");

        let attributes = attributes.with_menu(menu.clone());
        let mut tray = select_backend(
            &candidates.backends,
            candidates.forced_backend.as_deref(),
            &attributes,
            &proxy,
        )?;
        state = transition(state, CoordinatorState::BackendAttached);
        info!(backend = tray.backend_name(), tray_id = ?tray.id(), "tray backend attached");

        if let Err(err) = tray.set_tooltip(attributes.tooltip_or_title()) {
            error!(backend = tray.backend_name(), "failed to set tray tooltip: {err:#}");
        }
        state = transition(state, CoordinatorState::Running);

        Ok(Self {
            state,
            menu_helper,
            menu,
            tray,
            deferred: DeferredQueue::new(),
        })
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn tray(&self) -> &dyn TrayBackend {
        self.tray.as_ref()
    }

    pub fn tray_id(&self) -> TrayId {
        self.tray.id()
    }

    pub fn menu(&self) -> &Rc<TrayMenu> {
        &self.menu
    }

    /// Deferred menu calls not yet run.
    pub fn pending(&self) -> impl Iterator<Item = &DeferredAction> {
        self.deferred.iter()
    }

    /// Route one backend event.
    pub fn handle_event(&mut self, tray_id: TrayId, event: TrayEvent) -> EventOutcome {
        if self.state == CoordinatorState::Terminated {
            debug!(?event, "ignoring tray event after termination");
            return EventOutcome::Ignored;
        }
        if tray_id != self.tray.id() {
            debug!(?tray_id, ?event, "ignoring event from a detached tray");
            return EventOutcome::Ignored;
        }

        match event {
            TrayEvent::Click {
                button,
                state,
                time,
            } => {
                debug!(?button, ?state, time, "tray click");
                let action = match (button, state) {
                    (MouseButton::Left, ElementState::Pressed) => {
                        DeferredAction::Activate { button, time }
                    }
                    (MouseButton::Right, ElementState::Released) => {
                        DeferredAction::Popup { button, time }
                    }
                    _ => return EventOutcome::Ignored,
                };
                self.deferred.schedule(action);
                EventOutcome::Scheduled
            }
            TrayEvent::MouseOver { position } => {
                debug!(?position, "tray mouseover");
                EventOutcome::Handled
            }
            TrayEvent::ExitRequested => {
                info!("tray exit requested");
                self.request_exit();
                EventOutcome::Exit
            }
            TrayEvent::GeometryQuery => {
                if let Some(geometry) = self.query_geometry() {
                    info!(?geometry, "tray geometry");
                }
                EventOutcome::Handled
            }
            _ => EventOutcome::Ignored,
        }
    }

    /// Run the deferred menu calls queued before this call. Returns how many ran.
    pub fn run_deferred(&mut self) -> usize {
        if self.deferred.is_empty() {
            return 0;
        }
        let mut ran = 0;
        for action in self.deferred.take_batch() {
            if self.state == CoordinatorState::Terminated {
                break;
            }
            match action {
                DeferredAction::Activate { button, time } => {
                    self.menu_helper.activate(button, time)
                }
                DeferredAction::Popup { button, time } => self.menu_helper.popup(button, time),
            }
            ran += 1;
        }
        ran
    }

    /// Enter `Terminated`. Returns `false` when already terminated.
    pub fn request_exit(&mut self) -> bool {
        if self.state == CoordinatorState::Terminated {
            return false;
        }
        self.deferred.clear();
        self.state = transition(self.state, CoordinatorState::Terminated);
        true
    }

    /// Read the current tray geometry. Backend errors are logged, not propagated.
    pub fn query_geometry(&self) -> Option<TrayGeometry> {
        match self.tray.geometry() {
            Ok(geometry) => Some(geometry),
            Err(err) => {
                error!(backend = self.tray.backend_name(), "tray geometry query failed: {err:#}");
                None
            }
        }
    }

    /// Pass a window event on to the backend when it owns `window_id`.
    pub fn forward_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> bool {
        if self.tray.window_id() != Some(window_id) {
            return false;
        }
        self.tray.handle_window_event(event);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::sync::Arc;

    use anyhow::anyhow;
    use remote_tray_core::{ClientState, MenuAction};

    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    #[derive(Debug)]
    struct FakeTray {
        id: TrayId,
        name: &'static str,
        tooltip: Log,
        geometry: Option<TrayGeometry>,
    }

    impl TrayBackend for FakeTray {
        fn id(&self) -> TrayId {
            self.id
        }

        fn backend_name(&self) -> &'static str {
            self.name
        }

        fn set_tooltip(&mut self, tooltip: &str) -> anyhow::Result<()> {
            self.tooltip.borrow_mut().push(tooltip.to_string());
            Ok(())
        }

        fn geometry(&self) -> anyhow::Result<TrayGeometry> {
            self.geometry.ok_or_else(|| anyhow!("tray torn down"))
        }
    }

    #[derive(Debug)]
    struct FakeMenuHelper {
        calls: Log,
    }

    impl MenuHelper for FakeMenuHelper {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn build(&mut self) -> anyhow::Result<Rc<TrayMenu>> {
            Ok(Rc::new(TrayMenu::new("fake", Vec::new())))
        }

        fn activate(&self, button: MouseButton, time: u32) {
            self.calls.borrow_mut().push(format!("activate({button:?}, {time})"));
        }

        fn popup(&self, button: MouseButton, time: u32) {
            self.calls.borrow_mut().push(format!("popup({button:?}, {time})"));
        }
    }

    fn fake_helper<'a>(calls: Log) -> MenuHelperFactory<'a> {
        MenuHelperFactory::new("fake", || true, move |_| {
            Ok(Box::new(FakeMenuHelper {
                calls: calls.clone(),
            }) as Box<dyn MenuHelper>)
        })
    }

    fn failing_helper<'a>(name: &'static str) -> MenuHelperFactory<'a> {
        MenuHelperFactory::new(name, || true, |_| Err(anyhow!("unsupported")))
    }

    fn working_backend<'a>(
        name: &'static str,
        built: &'a Cell<usize>,
        tooltip: Log,
    ) -> TrayBackendFactory<'a> {
        TrayBackendFactory::new(name, || true, move |_, _| {
            built.set(built.get() + 1);
            Ok(Box::new(FakeTray {
                id: TrayId::next(),
                name,
                tooltip: tooltip.clone(),
                geometry: Some(TrayGeometry::new(10, 20, 24, 24)),
            }) as Box<dyn TrayBackend>)
        })
    }

    fn failing_backend<'a>(name: &'static str) -> TrayBackendFactory<'a> {
        TrayBackendFactory::new(name, || true, |_, _| Err(anyhow!("platform API absent")))
    }

    fn noop_proxy() -> TrayProxy {
        Arc::new(|_, _| {})
    }

    fn attributes() -> TrayAttributes {
        TrayAttributes::default().with_title("Test System Tray")
    }

    fn build(candidates: Candidates<'_>) -> Result<TrayCoordinator, HarnessError> {
        TrayCoordinator::new(&ClientState::default(), attributes(), candidates, noop_proxy())
    }

    fn running(calls: Log, built: &Cell<usize>) -> TrayCoordinator {
        let candidates = Candidates {
            menu_helpers: vec![fake_helper(calls)],
            backends: vec![working_backend("only", built, Log::default())],
            forced_backend: None,
        };
        build(candidates).unwrap()
    }

    fn click(button: MouseButton, state: ElementState, time: u32) -> TrayEvent {
        TrayEvent::Click {
            button,
            state,
            time,
        }
    }

    #[test]
    fn first_successful_backend_wins_in_every_order() {
        #[derive(Clone, Copy, Debug)]
        enum Kind {
            Fail,
            OkA,
            OkB,
        }
        let orders = [
            [Kind::Fail, Kind::OkA, Kind::OkB],
            [Kind::Fail, Kind::OkB, Kind::OkA],
            [Kind::OkA, Kind::Fail, Kind::OkB],
            [Kind::OkA, Kind::OkB, Kind::Fail],
            [Kind::OkB, Kind::Fail, Kind::OkA],
            [Kind::OkB, Kind::OkA, Kind::Fail],
        ];

        for order in orders {
            let built = Cell::new(0);
            let backends = order
                .iter()
                .map(|kind| match kind {
                    Kind::Fail => failing_backend("fail"),
                    Kind::OkA => working_backend("a", &built, Log::default()),
                    Kind::OkB => working_backend("b", &built, Log::default()),
                })
                .collect();
            let candidates = Candidates {
                menu_helpers: vec![fake_helper(Log::default())],
                backends,
                forced_backend: None,
            };
            let coordinator = build(candidates).unwrap();

            let expected = order
                .iter()
                .find_map(|kind| match kind {
                    Kind::Fail => None,
                    Kind::OkA => Some("a"),
                    Kind::OkB => Some("b"),
                })
                .unwrap();
            assert_eq!(coordinator.tray().backend_name(), expected, "order {order:?}");
            assert_eq!(built.get(), 1, "later candidates must not be built, order {order:?}");
            assert_eq!(coordinator.state(), CoordinatorState::Running);
        }
    }

    #[test]
    fn all_backends_failing_is_fatal() {
        let candidates = Candidates {
            menu_helpers: vec![fake_helper(Log::default())],
            backends: vec![failing_backend("native"), failing_backend("status-window")],
            forced_backend: None,
        };
        let err = build(candidates).unwrap_err();
        match err {
            HarnessError::NoTrayBackend { attempted } => assert_eq!(
                attempted,
                vec![
                    "native: platform API absent".to_string(),
                    "status-window: platform API absent".to_string(),
                ]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn no_backends_at_all_is_fatal() {
        let candidates = Candidates {
            menu_helpers: vec![fake_helper(Log::default())],
            ..Candidates::default()
        };
        let err = build(candidates).unwrap_err();
        assert!(matches!(err, HarnessError::NoTrayBackend { .. }));
    }

    #[test]
    fn menu_failure_is_fatal_before_any_backend_is_tried() {
        let built = Cell::new(0);
        let candidates = Candidates {
            menu_helpers: vec![failing_helper("native"), failing_helper("toolkit")],
            backends: vec![working_backend("a", &built, Log::default())],
            forced_backend: None,
        };
        let err = build(candidates).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::NoMenuHelper { ref attempted } if attempted.len() == 2
        ));
        assert!(err.to_string().starts_with("menu stage failed"));
        assert_eq!(built.get(), 0);
    }

    #[test]
    fn menu_helper_falls_through_to_next_candidate() {
        let calls = Log::default();
        let built = Cell::new(0);
        let candidates = Candidates {
            menu_helpers: vec![failing_helper("native"), fake_helper(calls)],
            backends: vec![working_backend("a", &built, Log::default())],
            forced_backend: None,
        };
        let coordinator = build(candidates).unwrap();
        assert_eq!(coordinator.menu().title(), "fake");
    }

    #[test]
    fn unavailable_and_unforced_candidates_are_skipped() {
        let built = Cell::new(0);
        let unavailable = TrayBackendFactory::new("native", || false, |_, _| {
            panic!("unavailable backends must not be constructed")
        });
        let candidates = Candidates {
            menu_helpers: vec![fake_helper(Log::default())],
            backends: vec![
                unavailable,
                working_backend("a", &built, Log::default()),
                working_backend("b", &built, Log::default()),
            ],
            forced_backend: Some("b".to_string()),
        };
        let coordinator = build(candidates).unwrap();
        assert_eq!(coordinator.tray().backend_name(), "b");
        assert_eq!(built.get(), 1);
    }

    #[test]
    fn tooltip_is_set_on_attach() {
        let built = Cell::new(0);
        let tooltip = Log::default();
        let candidates = Candidates {
            menu_helpers: vec![fake_helper(Log::default())],
            backends: vec![working_backend("a", &built, tooltip.clone())],
            forced_backend: None,
        };
        TrayCoordinator::new(
            &ClientState::default(),
            attributes().with_tooltip("hover text"),
            candidates,
            noop_proxy(),
        )
        .unwrap();
        assert_eq!(*tooltip.borrow(), vec!["hover text".to_string()]);
    }

    #[test]
    fn toolkit_helper_menu_reaches_backend() {
        let seen = RefCell::new(None);
        let candidates = Candidates {
            menu_helpers: crate::menu_helper::default_menu_helpers(),
            backends: vec![TrayBackendFactory::new("a", || true, |attr, _| {
                *seen.borrow_mut() = attr.menu.clone();
                Ok(Box::new(FakeTray {
                    id: TrayId::next(),
                    name: "a",
                    tooltip: Log::default(),
                    geometry: None,
                }) as Box<dyn TrayBackend>)
            })],
            forced_backend: None,
        };
        let coordinator = build(candidates).unwrap();
        let seen = seen.borrow();
        let menu = seen.as_ref().unwrap();
        assert!(Rc::ptr_eq(menu, coordinator.menu()));
        assert!(menu.item(&MenuAction::Disconnect).is_some());
    }

    #[test]
    fn primary_press_schedules_one_activate() {
        let calls = Log::default();
        let built = Cell::new(0);
        let mut coordinator = running(calls.clone(), &built);
        let id = coordinator.tray_id();

        let outcome =
            coordinator.handle_event(id, click(MouseButton::Left, ElementState::Pressed, 100));
        assert_eq!(outcome, EventOutcome::Scheduled);
        assert_eq!(
            coordinator.pending().copied().collect::<Vec<_>>(),
            vec![DeferredAction::Activate {
                button: MouseButton::Left,
                time: 100
            }]
        );
        // Nothing runs inside the event callback.
        assert!(calls.borrow().is_empty());

        assert_eq!(coordinator.run_deferred(), 1);
        assert_eq!(*calls.borrow(), vec!["activate(Left, 100)".to_string()]);
        assert_eq!(coordinator.pending().count(), 0);
    }

    #[test]
    fn secondary_release_schedules_one_popup() {
        let calls = Log::default();
        let built = Cell::new(0);
        let mut coordinator = running(calls.clone(), &built);
        let id = coordinator.tray_id();

        coordinator.handle_event(id, click(MouseButton::Right, ElementState::Released, 200));
        assert_eq!(
            coordinator.pending().copied().collect::<Vec<_>>(),
            vec![DeferredAction::Popup {
                button: MouseButton::Right,
                time: 200
            }]
        );
        coordinator.run_deferred();
        assert_eq!(*calls.borrow(), vec!["popup(Right, 200)".to_string()]);
    }

    #[test]
    fn mismatched_button_state_schedules_nothing() {
        let calls = Log::default();
        let built = Cell::new(0);
        let mut coordinator = running(calls.clone(), &built);
        let id = coordinator.tray_id();

        for event in [
            click(MouseButton::Left, ElementState::Released, 1),
            click(MouseButton::Right, ElementState::Pressed, 2),
            click(MouseButton::Middle, ElementState::Pressed, 3),
        ] {
            assert_eq!(coordinator.handle_event(id, event), EventOutcome::Ignored);
        }
        assert_eq!(coordinator.pending().count(), 0);
        assert_eq!(coordinator.run_deferred(), 0);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn exit_is_terminal_and_idempotent() {
        let calls = Log::default();
        let built = Cell::new(0);
        let mut coordinator = running(calls.clone(), &built);
        let id = coordinator.tray_id();

        coordinator.handle_event(id, click(MouseButton::Left, ElementState::Pressed, 5));
        assert_eq!(coordinator.handle_event(id, TrayEvent::ExitRequested), EventOutcome::Exit);
        assert_eq!(coordinator.state(), CoordinatorState::Terminated);

        assert_eq!(coordinator.handle_event(id, TrayEvent::ExitRequested), EventOutcome::Ignored);
        assert!(!coordinator.request_exit());
        assert_eq!(coordinator.state(), CoordinatorState::Terminated);

        // Pending work is dropped and nothing new is accepted.
        assert_eq!(
            coordinator.handle_event(id, click(MouseButton::Right, ElementState::Released, 6)),
            EventOutcome::Ignored
        );
        assert_eq!(coordinator.run_deferred(), 0);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn geometry_query_reads_without_mutating() {
        let calls = Log::default();
        let built = Cell::new(0);
        let mut coordinator = running(calls, &built);
        let id = coordinator.tray_id();

        assert_eq!(coordinator.query_geometry(), Some(TrayGeometry::new(10, 20, 24, 24)));
        assert_eq!(coordinator.handle_event(id, TrayEvent::GeometryQuery), EventOutcome::Handled);
        assert_eq!(coordinator.state(), CoordinatorState::Running);
        assert_eq!(coordinator.pending().count(), 0);
        assert_eq!(coordinator.query_geometry(), Some(TrayGeometry::new(10, 20, 24, 24)));
    }

    #[test]
    fn geometry_fault_is_contained() {
        let candidates = Candidates {
            menu_helpers: vec![fake_helper(Log::default())],
            backends: vec![TrayBackendFactory::new("torn", || true, |_, _| {
                Ok(Box::new(FakeTray {
                    id: TrayId::next(),
                    name: "torn",
                    tooltip: Log::default(),
                    geometry: None,
                }) as Box<dyn TrayBackend>)
            })],
            forced_backend: None,
        };
        let mut coordinator = build(candidates).unwrap();
        let id = coordinator.tray_id();

        assert_eq!(coordinator.query_geometry(), None);
        assert_eq!(coordinator.handle_event(id, TrayEvent::GeometryQuery), EventOutcome::Handled);
        assert_eq!(coordinator.state(), CoordinatorState::Running);
    }

    #[test]
    fn mouseover_only_logs() {
        let calls = Log::default();
        let built = Cell::new(0);
        let mut coordinator = running(calls.clone(), &built);
        let id = coordinator.tray_id();

        let outcome = coordinator.handle_event(id, TrayEvent::MouseOver { position: None });
        assert_eq!(outcome, EventOutcome::Handled);
        assert_eq!(coordinator.pending().count(), 0);
        assert_eq!(coordinator.state(), CoordinatorState::Running);
    }

    #[test]
    fn events_from_other_trays_are_ignored() {
        let calls = Log::default();
        let built = Cell::new(0);
        let mut coordinator = running(calls, &built);

        let stale = TrayId::next();
        assert_eq!(
            coordinator.handle_event(stale, TrayEvent::ExitRequested),
            EventOutcome::Ignored
        );
        assert_eq!(coordinator.state(), CoordinatorState::Running);
    }
}
