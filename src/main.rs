//! Main module for the mofu timer front end using Yew.
//! Wires UI components, `AppState` and the remote side effects.

use chrono::{Local, NaiveDate};
use log::{debug, info, warn};
use mofu_timer::api::{ApiClient, DeviceRegistration};
use mofu_timer::cache;
use mofu_timer::config::*;
use mofu_timer::notification::{export_text, selected_races};
use mofu_timer::plan::verify_code;
use mofu_timer::schedule::{ladies_races, load_schedule, Mode, ScheduleLoad};
use mofu_timer::settings::Settings;
use mofu_timer::state::{AppState, Effect};
use mofu_timer::storage::{ensure_anon_user_id, generate_anon_user_id, BrowserStorage, KeyValueStore};
use mofu_timer::sync::{
    push_removal, push_subscription, push_subscriptions, register_device_once, resync_payloads,
    send_test_push, test_push_for, SyncContext, TEST_PUSH_SENDING,
};
use mofu_timer::utils::{date_key, date_label};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

mod components;
mod hooks;
mod push;

use components::{Header, LadiesAccordion, NotificationsPage, RowContext, SettingsModal, VenueCard};
use hooks::{cancel, debounce, use_hash_route, use_now, DebounceSlot, Route};

// ──────────────────────────────────────────────────────────────────────────────
// Helper functions

fn page_origin() -> String {
    gloo_utils::window().location().origin().unwrap_or_default()
}

fn alert(message: &str) {
    if gloo_utils::window().alert_with_message(message).is_err() {
        warn!("alert failed: {}", message);
    }
}

/// Shared handle to the application state. Mutations go through
/// [`Controller::update`], which re-renders and fires the returned effects.
#[derive(Clone)]
struct Controller {
    app: Rc<RefCell<AppState>>,
    redraw: UseForceUpdateHandle,
    api: Rc<ApiClient>,
}

impl Controller {
    fn update(&self, change: impl FnOnce(&mut AppState) -> Vec<Effect>) {
        let effects = change(&mut self.app.borrow_mut());
        self.redraw.force_update();
        self.run_effects(effects);
    }

    fn run_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Alert(message) => alert(&message),
                Effect::Subscribe(subscription) | Effect::Unsubscribe(subscription) => {
                    let api = self.api.clone();
                    spawn_local(async move { push_subscription(&api, &subscription).await });
                }
                Effect::Remove(removal) => {
                    let api = self.api.clone();
                    spawn_local(async move { push_removal(&api, &removal).await });
                }
            }
        }
    }

    /// Verify `code` now; results for a code that has since changed are dropped.
    fn verify(&self, anon_user_id: String, code: String) {
        self.update(|s| {
            s.begin_verifying();
            Vec::new()
        });
        let this = self.clone();
        spawn_local(async move {
            let plan = verify_code(&this.api, &anon_user_id, &code).await;
            if this.app.borrow().settings.pro_code != code {
                debug!("Dropping verification for a stale code");
                return;
            }
            info!("Plan verified: pro={} max={}", plan.pro, plan.max_notifications());
            this.update(|s| {
                s.apply_plan(plan);
                Vec::new()
            });
        });
    }
}

// ──────────────────────────────────────────────────────────────────────────────

/// Primary application component wiring state, effects, and UI elements.
#[function_component]
pub fn App() -> Html {
    let app = use_mut_ref(|| AppState::load(&BrowserStorage));
    let redraw = use_force_update();
    let api = use_memo((), |_| ApiClient::from_env());
    let feed_client = use_memo((), |_| reqwest::Client::new());
    let anon_user_id = use_memo((), |_| ensure_anon_user_id(&BrowserStorage, generate_anon_user_id));
    let origin = use_memo((), |_| page_origin());
    let today: NaiveDate = *use_memo((), |_| Local::now().date_naive());
    let now = use_now(NOW_REFRESH_MS);
    let (route, navigate) = use_hash_route();

    let mode = use_state(|| Mode::Keirin);
    let schedule = use_state(ScheduleLoad::default);
    let loading = use_state(|| false);
    // Bumped per load so a slow response for an old mode is ignored.
    let load_token = use_mut_ref(|| 0u32);
    let settings_open = use_state(|| false);
    let token = use_state(|| BrowserStorage.get(STORAGE_FCM_TOKEN).filter(|t| !t.trim().is_empty()));
    let test_push_status = use_state(String::new);
    let verify_slot: DebounceSlot = use_mut_ref(|| None);
    let resync_slot: DebounceSlot = use_mut_ref(|| None);

    let ctrl = Controller {
        app: app.clone(),
        redraw,
        api: api.clone(),
    };
    let snapshot = app.borrow().clone();
    let sync_ctx = SyncContext {
        anon_user_id: (*anon_user_id).clone(),
        origin: (*origin).clone(),
        race_date: date_key(today),
    };

    // Save on every change
    use_effect_with(snapshot.clone(), |state| {
        state.persist(&BrowserStorage);
    });

    // Foreground push messages
    use_effect_with((), |_| {
        push::listen_foreground_messages();
    });

    // Load the schedule for the current mode
    {
        let schedule = schedule.clone();
        let loading = loading.clone();
        let load_token = load_token.clone();
        let client = feed_client.clone();
        use_effect_with(*mode, move |&mode| {
            let token = {
                let mut current = load_token.borrow_mut();
                *current = current.wrapping_add(1);
                *current
            };
            loading.set(true);
            spawn_local(async move {
                let bust = js_sys::Date::now() as i64;
                let loaded = load_schedule(&client, mode, today, bust).await;
                if *load_token.borrow() != token {
                    return;
                }
                cache::index_venues(&loaded.venues);
                info!("Loaded {} venues for {}", loaded.venues.len(), mode);
                schedule.set(loaded);
                loading.set(false);
            });
        });
    }

    // Debounced PRO verification whenever the code changes (and on mount)
    {
        let ctrl = ctrl.clone();
        let slot = verify_slot.clone();
        let anon_user_id = (*anon_user_id).clone();
        use_effect_with(snapshot.settings.pro_code.clone(), move |code| {
            let code = code.clone();
            debounce(&slot, VERIFY_DEBOUNCE_MS, move || ctrl.verify(anon_user_id, code));
        });
    }

    // Debounced full resync of the selection
    {
        let app = app.clone();
        let api = api.clone();
        let slot = resync_slot.clone();
        let ctx = sync_ctx.clone();
        let deps = (
            snapshot.settings.clone(),
            snapshot.timer2_active(),
            snapshot.selection.clone(),
            cache::indexed_count(),
        );
        use_effect_with(deps, move |_| {
            debounce(&slot, RESYNC_DEBOUNCE_MS, move || {
                let payloads = {
                    let state = app.borrow();
                    if !api.is_configured() || state.selection.is_empty() {
                        return;
                    }
                    resync_payloads(&state.selection, &state.settings, state.timer2_active(), &ctx, cache::lookup_race)
                };
                spawn_local(async move { push_subscriptions(&api, payloads).await });
            });
        });
    }

    // --- Race handlers ---
    let on_toggle_race = {
        let ctrl = ctrl.clone();
        let ctx = sync_ctx.clone();
        Callback::from(move |race_key: String| {
            let race = cache::lookup_race(&race_key);
            ctrl.update(|s| s.toggle_race(&race_key, race.as_ref(), &ctx));
        })
    };
    let on_set_venue = {
        let ctrl = ctrl.clone();
        let ctx = sync_ctx.clone();
        let schedule = schedule.clone();
        Callback::from(move |(venue_key, on): (String, bool)| {
            if let Some(venue) = schedule.venues.iter().find(|v| v.venue_key == venue_key) {
                ctrl.update(|s| s.set_races(&venue.races, on, &ctx));
            }
        })
    };
    let ladies = if *mode == Mode::Keirin { ladies_races(&schedule.venues) } else { Vec::new() };
    let on_set_ladies = {
        let ctrl = ctrl.clone();
        let ctx = sync_ctx.clone();
        let races = ladies.clone();
        Callback::from(move |on: bool| ctrl.update(|s| s.set_races(&races, on, &ctx)))
    };
    let on_toggle_open = {
        let ctrl = ctrl.clone();
        Callback::from(move |venue_key: String| {
            ctrl.update(|s| {
                s.toggle_venue_open(&venue_key);
                Vec::new()
            })
        })
    };
    let on_remove = {
        let ctrl = ctrl.clone();
        let ctx = sync_ctx.clone();
        Callback::from(move |race_key: String| ctrl.update(|s| s.remove_notification(&race_key, &ctx)))
    };

    // --- Header handlers ---
    let on_mode = {
        let mode = mode.clone();
        let navigate = navigate.clone();
        Callback::from(move |next: Mode| {
            mode.set(next);
            if route == Route::Notifications {
                navigate.emit(Route::Home);
            }
        })
    };
    let open_settings = {
        let settings_open = settings_open.clone();
        Callback::from(move |_| settings_open.set(true))
    };

    // --- Settings handlers ---
    let on_settings_change = {
        let ctrl = ctrl.clone();
        Callback::from(move |next: Settings| {
            ctrl.update(|s| {
                s.settings = next;
                Vec::new()
            })
        })
    };
    let on_timer2 = {
        let ctrl = ctrl.clone();
        Callback::from(move |on: bool| {
            ctrl.update(|s| {
                s.set_timer2_enabled(on);
                Vec::new()
            })
        })
    };
    let on_code_input = {
        let ctrl = ctrl.clone();
        Callback::from(move |code: String| {
            ctrl.update(|s| {
                s.settings.pro_code = code;
                Vec::new()
            })
        })
    };
    let on_verify_now = {
        let ctrl = ctrl.clone();
        let slot = verify_slot.clone();
        let anon_user_id = (*anon_user_id).clone();
        Callback::from(move |_| {
            cancel(&slot);
            let code = ctrl.app.borrow().settings.pro_code.clone();
            ctrl.verify(anon_user_id.clone(), code);
        })
    };
    let on_register = {
        let ctrl = ctrl.clone();
        let token = token.clone();
        let anon_user_id = (*anon_user_id).clone();
        let origin = (*origin).clone();
        Callback::from(move |_| {
            let ctrl = ctrl.clone();
            let token = token.clone();
            let anon_user_id = anon_user_id.clone();
            let origin = origin.clone();
            spawn_local(async move {
                match push::request_push_token().await {
                    Ok(Some(t)) => {
                        BrowserStorage.set(STORAGE_FCM_TOKEN, &t);
                        token.set(Some(t.clone()));
                        let registration = DeviceRegistration {
                            anon_user_id,
                            token: t,
                            platform: "web",
                            ua: gloo_utils::window().navigator().user_agent().unwrap_or_default(),
                            origin,
                            ts: js_sys::Date::now() as i64,
                        };
                        register_device_once(&ctrl.api, &BrowserStorage, &registration).await;
                        ctrl.update(|s| {
                            s.settings.notifications_enabled = true;
                            Vec::new()
                        });
                    }
                    Ok(None) => info!("Notification permission not granted"),
                    Err(e) => alert(&format!("失敗: {}", e)),
                }
            });
        })
    };
    let on_test_push = {
        let api = api.clone();
        let token = token.clone();
        let status = test_push_status.clone();
        let ctx = sync_ctx.clone();
        Callback::from(move |_| {
            let Some(t) = (*token).clone() else {
                return;
            };
            let api = api.clone();
            let status = status.clone();
            let push = test_push_for(&t, &ctx);
            status.set(TEST_PUSH_SENDING.to_string());
            spawn_local(async move {
                let result = send_test_push(&api, &push).await;
                status.set(result.to_string());
            });
        })
    };
    let on_reset = {
        let ctrl = ctrl.clone();
        Callback::from(move |_| {
            ctrl.update(|s| {
                s.reset_selection();
                Vec::new()
            })
        })
    };
    let close_settings = {
        let settings_open = settings_open.clone();
        Callback::from(move |_| settings_open.set(false))
    };

    let row_ctx = RowContext {
        now,
        settings: snapshot.settings.clone(),
        timer2_active: snapshot.timer2_active(),
    };

    let body = match route {
        Route::Notifications => {
            let rows = selected_races(&snapshot.selection, cache::lookup_race);
            let unresolved = snapshot.selection.len().saturating_sub(rows.len());
            let text = export_text(&rows);
            html! {
                <NotificationsPage
                    {unresolved}
                    export_text={text}
                    rows={rows}
                    ctx={row_ctx.clone()}
                    on_remove={on_remove}
                />
            }
        }
        Route::Home => html! {
            <main class="venues">
                if *loading {
                    <p class="loading">{ "読み込み中..." }</p>
                } else if let Some(err) = &schedule.error {
                    <p class="current-error">{ err }</p>
                } else if schedule.venues.is_empty() {
                    <p class="empty">{ "本日の開催はありません。" }</p>
                }
                <LadiesAccordion
                    races={ladies}
                    selection={snapshot.selection.clone()}
                    ctx={row_ctx.clone()}
                    on_toggle_race={on_toggle_race.clone()}
                    on_set_all={on_set_ladies}
                />
                { schedule.venues.iter().map(|venue| html! {
                    <VenueCard
                        key={venue.venue_key.clone()}
                        venue={venue.clone()}
                        open={snapshot.is_venue_open(&venue.venue_key)}
                        selection={snapshot.selection.clone()}
                        ctx={row_ctx.clone()}
                        on_toggle_open={on_toggle_open.clone()}
                        on_toggle_race={on_toggle_race.clone()}
                        on_set_all={on_set_venue.clone()}
                    />
                }).collect::<Html>() }
            </main>
        },
    };

    html! {
        <div class="container">
            <Header
                date_label={date_label(today)}
                mode={*mode}
                route={route}
                count={snapshot.selection.len()}
                quota={snapshot.max_notifications()}
                plan_message={snapshot.plan.message.clone()}
                on_mode={on_mode}
                on_navigate={navigate}
                on_open_settings={open_settings}
            />
            { body }
            if !snapshot.plan.ads_off() {
                <div class="ad-slot"></div>
            }
            if *settings_open {
                <SettingsModal
                    settings={snapshot.settings.clone()}
                    plan={snapshot.plan.clone()}
                    token={(*token).clone()}
                    test_push_status={(*test_push_status).clone()}
                    on_change={on_settings_change}
                    on_timer2={on_timer2}
                    on_code_input={on_code_input}
                    on_verify_now={on_verify_now}
                    on_register={on_register}
                    on_test_push={on_test_push}
                    on_reset={on_reset}
                    on_close={close_settings}
                />
            }
        </div>
    }
}

/// Entry point: installs logging and renders the App component.
fn main() {
    console_error_panic_hook::set_once();
    // Only fails when a logger is already installed.
    let _ = console_log::init_with_level(log::Level::Debug);
    yew::Renderer::<App>::new().render();
}
