//! Yew view components for the mofu timer UI.
//!
//! Components here only render props and emit callbacks; every state
//! change happens in `main.rs` through `AppState`.

use chrono::NaiveDateTime;
use mofu_timer::config::{LADIES_CLASS_MARKER, TIMER_MINUTE_CHOICES};
use mofu_timer::deadline::{deadline_label, is_closed, reminder_label, reminder_passed};
use mofu_timer::plan::PlanState;
use mofu_timer::schedule::{Mode, Race, Venue};
use mofu_timer::selection::Selection;
use mofu_timer::settings::{link_targets_for, link_url, LinkTarget, Settings};
use mofu_timer::utils::{format_token_short, parse_minute_choice};
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use crate::hooks::Route;

/// Values every race row needs besides the race itself.
#[derive(Clone, PartialEq)]
pub struct RowContext {
    pub now: NaiveDateTime,
    pub settings: Settings,
    pub timer2_active: bool,
}

impl RowContext {
    fn race_link(&self, race: &Race) -> String {
        link_url(self.settings.link_target_for(race.mode), &race.url, race.mode)
    }
}

#[derive(Properties, PartialEq)]
pub struct HeaderProps {
    pub date_label: String,
    pub mode: Mode,
    pub route: Route,
    pub count: usize,
    pub quota: usize,
    pub plan_message: String,
    pub on_mode: Callback<Mode>,
    pub on_navigate: Callback<Route>,
    pub on_open_settings: Callback<()>,
}

#[function_component(Header)]
pub fn header(props: &HeaderProps) -> Html {
    let mode_button = |mode: Mode| {
        let on_mode = props.on_mode.clone();
        let class = if props.mode == mode { "mode-btn active" } else { "mode-btn" };
        html! {
            <button {class} onclick={Callback::from(move |_| on_mode.emit(mode))}>{ mode.label() }</button>
        }
    };
    let nav = {
        let on_navigate = props.on_navigate.clone();
        let next = match props.route {
            Route::Home => Route::Notifications,
            Route::Notifications => Route::Home,
        };
        Callback::from(move |_| on_navigate.emit(next))
    };

    html! {
        <header class="app-header">
            <div class="title-row">
                <h1>{ mofu_timer::config::APP_TITLE }</h1>
                <span class="date">{ &props.date_label }</span>
            </div>
            <div class="mode-row">
                { mode_button(Mode::Keirin) }
                { mode_button(Mode::Autorace) }
            </div>
            <div class="status-row">
                <button class="notify-count" onclick={nav}>
                    { format!("通知 {}/{}", props.count, props.quota) }
                </button>
                if !props.plan_message.is_empty() {
                    <span class="plan-message">{ &props.plan_message }</span>
                }
                <button class="settings-toggle" onclick={props.on_open_settings.reform(|_| ())}>{ "設定" }</button>
            </div>
        </header>
    }
}

#[derive(Properties, PartialEq)]
pub struct RaceRowProps {
    pub race: Race,
    pub selected: bool,
    pub ctx: RowContext,
    pub on_toggle: Callback<String>,
}

#[function_component(RaceRow)]
pub fn race_row(props: &RaceRowProps) -> Html {
    let race = &props.race;
    let ctx = &props.ctx;
    let today = ctx.now.date();
    let closed = is_closed(&race.closed_at_hhmm, ctx.now);
    let timer1 = ctx.settings.timer1_minutes_before;
    let timer2 = ctx.settings.timer2_minutes_before;
    let link = ctx.race_link(race);

    let onchange = {
        let on_toggle = props.on_toggle.clone();
        let key = race.race_key.clone();
        Callback::from(move |_: Event| on_toggle.emit(key.clone()))
    };

    let mut class = classes!("race-row");
    if closed {
        class.push("closed");
    }
    if props.selected {
        class.push("selected");
    }

    html! {
        <div {class}>
            <span class="race-no">{ format!("{}R", race.race_no) }</span>
            <div class="race-main">
                if link.is_empty() {
                    <span class="race-title">{ &race.title }</span>
                } else {
                    <a class="race-title" href={link} target="_blank" rel="noopener">{ &race.title }</a>
                }
                if !race.players.is_empty() {
                    <span class="players">{ race.players.join(" / ") }</span>
                }
            </div>
            <span class="deadline">{ format!("締切 {}", deadline_label(&race.closed_at_hhmm)) }</span>
            <span class={classes!("reminder", reminder_passed(&race.closed_at_hhmm, timer1, ctx.now).then_some("passed"))}>
                { format!("通知 {}", reminder_label(&race.closed_at_hhmm, timer1, today)) }
            </span>
            if ctx.timer2_active {
                <span class={classes!("reminder", reminder_passed(&race.closed_at_hhmm, timer2, ctx.now).then_some("passed"))}>
                    { format!("2回目 {}", reminder_label(&race.closed_at_hhmm, timer2, today)) }
                </span>
            }
            <label class="toggle">
                <input type="checkbox" checked={props.selected} disabled={closed} {onchange} />
            </label>
        </div>
    }
}

fn race_rows(races: &[Race], selection: &Selection, ctx: &RowContext, on_toggle: &Callback<String>) -> Html {
    races
        .iter()
        .map(|race| {
            html! {
                <RaceRow
                    key={race.race_key.clone()}
                    race={race.clone()}
                    selected={selection.contains(&race.race_key)}
                    ctx={ctx.clone()}
                    on_toggle={on_toggle.clone()}
                />
            }
        })
        .collect()
}

fn bulk_buttons(on_set_all: Callback<bool>) -> Html {
    let on = on_set_all.clone();
    html! {
        <div class="bulk">
            <button class="btn-secondary small" onclick={Callback::from(move |_| on.emit(true))}>{ "全ON" }</button>
            <button class="btn-secondary small" onclick={Callback::from(move |_| on_set_all.emit(false))}>{ "全OFF" }</button>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct VenueCardProps {
    pub venue: Venue,
    pub open: bool,
    pub selection: Selection,
    pub ctx: RowContext,
    pub on_toggle_open: Callback<String>,
    pub on_toggle_race: Callback<String>,
    /// `(venue_key, on)`
    pub on_set_all: Callback<(String, bool)>,
}

/// One venue as an accordion.
#[function_component(VenueCard)]
pub fn venue_card(props: &VenueCardProps) -> Html {
    let venue = &props.venue;
    let selected = venue.races.iter().filter(|r| props.selection.contains(&r.race_key)).count();
    let toggle_open = {
        let on_toggle_open = props.on_toggle_open.clone();
        let key = venue.venue_key.clone();
        Callback::from(move |_| on_toggle_open.emit(key.clone()))
    };
    let set_all = {
        let on_set_all = props.on_set_all.clone();
        let key = venue.venue_key.clone();
        Callback::from(move |on: bool| on_set_all.emit((key.clone(), on)))
    };

    html! {
        <section class="venue-card">
            <button class="venue-header" aria-expanded={props.open.to_string()} onclick={toggle_open}>
                <span class="venue-name">{ &venue.venue_name }</span>
                if !venue.grade.is_empty() {
                    <span class="grade">{ &venue.grade }</span>
                }
                <span class="venue-count">{ format!("{}/{}", selected, venue.races.len()) }</span>
                <span class="chevron"></span>
            </button>
            if props.open {
                <div class="venue-body">
                    { bulk_buttons(set_all) }
                    { race_rows(&venue.races, &props.selection, &props.ctx, &props.on_toggle_race) }
                </div>
            }
        </section>
    }
}

#[derive(Properties, PartialEq)]
pub struct LadiesAccordionProps {
    pub races: Vec<Race>,
    pub selection: Selection,
    pub ctx: RowContext,
    pub on_toggle_race: Callback<String>,
    pub on_set_all: Callback<bool>,
}

/// Ladies' races across all venues, by closing time.
#[function_component(LadiesAccordion)]
pub fn ladies_accordion(props: &LadiesAccordionProps) -> Html {
    let open = use_state(|| false);
    if props.races.is_empty() {
        return html! {};
    }
    let toggle = {
        let open = open.clone();
        Callback::from(move |_| open.set(!*open))
    };

    html! {
        <section class="venue-card ladies">
            <button class="venue-header" aria-expanded={(*open).to_string()} onclick={toggle}>
                <span class="venue-name">{ format!("ガールズ（{}）", LADIES_CLASS_MARKER) }</span>
                <span class="venue-count">{ props.races.len() }</span>
                <span class="chevron"></span>
            </button>
            if *open {
                <div class="venue-body">
                    { bulk_buttons(props.on_set_all.clone()) }
                    { props.races.iter().map(|race| html! {
                        <div class="ladies-row" key={race.race_key.clone()}>
                            <span class="venue-name">{ &race.venue_name }</span>
                            { race_rows(std::slice::from_ref(race), &props.selection, &props.ctx, &props.on_toggle_race) }
                        </div>
                    }).collect::<Html>() }
                </div>
            }
        </section>
    }
}

#[derive(Properties, PartialEq)]
pub struct NotificationsPageProps {
    pub rows: Vec<Race>,
    /// Selected keys with no known race (another day or an unloaded mode).
    pub unresolved: usize,
    pub export_text: String,
    pub ctx: RowContext,
    pub on_remove: Callback<String>,
}

#[function_component(NotificationsPage)]
pub fn notifications_page(props: &NotificationsPageProps) -> Html {
    let today = props.ctx.now.date();
    html! {
        <div class="notifications-page">
            <h2>{ "通知一覧" }</h2>
            if props.rows.is_empty() {
                <p class="empty">{ "通知するレースはありません。" }</p>
            }
            { props.rows.iter().map(|race| {
                let remove = {
                    let on_remove = props.on_remove.clone();
                    let key = race.race_key.clone();
                    Callback::from(move |_| on_remove.emit(key.clone()))
                };
                let link = props.ctx.race_link(race);
                html! {
                    <div class="notification-row" key={race.race_key.clone()}>
                        <span class="venue-name">{ format!("{} {}R", race.venue_name, race.race_no) }</span>
                        <span class="deadline">{ format!("締切 {}", deadline_label(&race.closed_at_hhmm)) }</span>
                        <span class="reminder">
                            { format!("通知 {}", reminder_label(&race.closed_at_hhmm, props.ctx.settings.timer1_minutes_before, today)) }
                        </span>
                        if !link.is_empty() {
                            <a href={link} target="_blank" rel="noopener">{ "レース情報" }</a>
                        }
                        <button class="btn-secondary small" onclick={remove}>{ "削除" }</button>
                    </div>
                }
            }).collect::<Html>() }
            if props.unresolved > 0 {
                <p class="note">{ format!("本日の一覧にない通知: {}件", props.unresolved) }</p>
            }
            if !props.export_text.is_empty() {
                <textarea class="export" readonly=true rows="6" value={props.export_text.clone()} />
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct SettingsModalProps {
    pub settings: Settings,
    pub plan: PlanState,
    pub token: Option<String>,
    pub test_push_status: String,
    pub on_change: Callback<Settings>,
    pub on_timer2: Callback<bool>,
    pub on_code_input: Callback<String>,
    pub on_verify_now: Callback<()>,
    pub on_register: Callback<()>,
    pub on_test_push: Callback<()>,
    pub on_reset: Callback<()>,
    pub on_close: Callback<()>,
}

fn minutes_select(value: u32, settings: &Settings, on_change: &Callback<Settings>, apply: fn(&mut Settings, u32)) -> Html {
    let onchange = {
        let settings = settings.clone();
        let on_change = on_change.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            match parse_minute_choice(&select.value()) {
                Ok(minutes) => {
                    let mut next = settings.clone();
                    apply(&mut next, minutes);
                    on_change.emit(next);
                }
                Err(err) => log::warn!("{}", err),
            }
        })
    };
    html! {
        <select {onchange}>
            { TIMER_MINUTE_CHOICES.iter().map(|&m| html! {
                <option value={m.to_string()} selected={m == value}>{ format!("{}分前", m) }</option>
            }).collect::<Html>() }
        </select>
    }
}

fn link_target_select(mode: Mode, settings: &Settings, on_change: &Callback<Settings>) -> Html {
    let current = settings.link_target_for(mode);
    let onchange = {
        let settings = settings.clone();
        let on_change = on_change.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            let mut next = settings.clone();
            next.set_link_target_for(mode, LinkTarget::from_key(&select.value()));
            on_change.emit(next);
        })
    };
    html! {
        <div class="form-group">
            <label>{ format!("{}のリンク先", mode.label()) }</label>
            <select {onchange}>
                { link_targets_for(mode).iter().map(|(target, label)| html! {
                    <option value={target.key()} selected={*target == current}>{ *label }</option>
                }).collect::<Html>() }
            </select>
        </div>
    }
}

/// Settings dialog: reminder offsets, link targets, PRO code and push setup.
#[function_component(SettingsModal)]
pub fn settings_modal(props: &SettingsModalProps) -> Html {
    let settings = &props.settings;
    let plan = &props.plan;
    let gate_open = plan.timer2_gate_open();

    let on_code = {
        let on_code_input = props.on_code_input.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            on_code_input.emit(input.value());
        })
    };
    let on_timer2 = {
        let on_timer2 = props.on_timer2.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            on_timer2.emit(input.checked());
        })
    };
    let token_label = props
        .token
        .as_deref()
        .map(format_token_short)
        .unwrap_or_else(|| "未取得".to_string());

    html! {
        <div class="modal-backdrop">
            <div class="modal">
                <h2>{ "設定" }</h2>

                <div class="form-group">
                    <label>{ "通知タイミング" }</label>
                    { minutes_select(settings.timer1_minutes_before, settings, &props.on_change, |s, m| s.timer1_minutes_before = m) }
                </div>

                <div class="form-group checkbox-group">
                    <label>
                        <input type="checkbox" checked={settings.timer2_enabled && gate_open} disabled={!gate_open} onchange={on_timer2} />
                        { "2回目の通知（PRO）" }
                    </label>
                    if settings.timer2_enabled && gate_open {
                        { minutes_select(settings.timer2_minutes_before, settings, &props.on_change, |s, m| s.timer2_minutes_before = m) }
                    }
                </div>

                { link_target_select(Mode::Keirin, settings, &props.on_change) }
                { link_target_select(Mode::Autorace, settings, &props.on_change) }

                <div class="form-group">
                    <label for="pro_code_input">{ "PROコード" }</label>
                    <input id="pro_code_input" type="text" value={settings.pro_code.clone()} oninput={on_code} />
                    <button class="btn-secondary small" disabled={plan.is_loading()} onclick={props.on_verify_now.reform(|_| ())}>
                        { "確認" }
                    </button>
                    <div class="plan-status">
                        if plan.is_loading() {
                            { "確認中..." }
                        } else {
                            { &plan.message }
                        }
                        if !plan.period.is_empty() {
                            <span class="period">{ &plan.period }</span>
                        }
                    </div>
                </div>

                <div class="form-group">
                    <label>{ "プッシュ通知" }</label>
                    <button class="btn-primary" onclick={props.on_register.reform(|_| ())}>
                        { if settings.notifications_enabled { "再登録" } else { "通知を有効にする" } }
                    </button>
                    <span class="token">{ token_label }</span>
                    <button class="btn-secondary small" disabled={props.token.is_none()} onclick={props.on_test_push.reform(|_| ())}>
                        { "テスト通知" }
                    </button>
                    if !props.test_push_status.is_empty() {
                        <span class="test-status">{ &props.test_push_status }</span>
                    }
                </div>

                <div class="modal-actions">
                    <button class="btn-secondary" onclick={props.on_reset.reform(|_| ())}>{ "選択をリセット" }</button>
                    <button class="btn-primary" onclick={props.on_close.reform(|_| ())}>{ "閉じる" }</button>
                </div>
            </div>
        </div>
    }
}
