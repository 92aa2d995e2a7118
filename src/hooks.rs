use chrono::{Local, NaiveDateTime};
use gloo_timers::callback::{Interval, Timeout};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use yew::prelude::*;

/// Pending timer slot for one debounced concern.
pub type DebounceSlot = Rc<RefCell<Option<Timeout>>>;

/// Run `f` after `delay_ms`, dropping (and so cancelling) whatever was
/// pending in `slot`.
pub fn debounce(slot: &DebounceSlot, delay_ms: u32, f: impl FnOnce() + 'static) {
    // A fired handle stays in the slot until the next call replaces it.
    let handle = Timeout::new(delay_ms, f);
    slot.borrow_mut().replace(handle);
}

/// Cancel a pending call, if any.
pub fn cancel(slot: &DebounceSlot) {
    if let Some(pending) = slot.borrow_mut().take() {
        pending.cancel();
    }
}

/// Local wall-clock time, refreshed every `refresh_ms` rather than per render.
#[hook]
pub fn use_now(refresh_ms: u32) -> NaiveDateTime {
    let now = use_state(|| Local::now().naive_local());
    {
        let now = now.clone();
        use_effect_with(refresh_ms, move |&refresh_ms| {
            let interval = Interval::new(refresh_ms, move || now.set(Local::now().naive_local()));
            move || drop(interval)
        });
    }
    *now
}

/// Top-level pages, selected by the URL hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Notifications,
}

impl Route {
    pub fn from_hash(hash: &str) -> Self {
        match hash.trim_start_matches('#') {
            "notifications" => Route::Notifications,
            _ => Route::Home,
        }
    }

    pub fn hash(&self) -> &'static str {
        match self {
            Route::Home => "",
            Route::Notifications => "#notifications",
        }
    }
}

fn current_route() -> Route {
    let hash = gloo_utils::window().location().hash().unwrap_or_default();
    Route::from_hash(&hash)
}

/// Current route plus a callback that navigates by rewriting the hash.
#[hook]
pub fn use_hash_route() -> (Route, Callback<Route>) {
    let route = use_state(current_route);
    {
        let route = route.clone();
        use_effect_with((), move |_| {
            let listener = Closure::<dyn FnMut()>::new(move || route.set(current_route()));
            let window = gloo_utils::window();
            if window
                .add_event_listener_with_callback("hashchange", listener.as_ref().unchecked_ref())
                .is_err()
            {
                log::warn!("Could not listen for hashchange");
            }
            move || {
                if window
                    .remove_event_listener_with_callback("hashchange", listener.as_ref().unchecked_ref())
                    .is_err()
                {
                    log::warn!("Could not remove hashchange listener");
                }
            }
        });
    }
    let navigate = {
        let route = route.clone();
        Callback::from(move |next: Route| {
            if gloo_utils::window().location().set_hash(next.hash()).is_err() {
                log::warn!("Could not update location hash");
            }
            route.set(next);
        })
    };
    (*route, navigate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_from_hash() {
        assert_eq!(Route::from_hash("#notifications"), Route::Notifications);
        assert_eq!(Route::from_hash("notifications"), Route::Notifications);
        assert_eq!(Route::from_hash(""), Route::Home);
        assert_eq!(Route::from_hash("#other"), Route::Home);
    }
}
