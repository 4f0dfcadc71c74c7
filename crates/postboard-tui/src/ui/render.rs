use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use postboard_core::forms::{Field, FormErrors};
use postboard_core::routes::SIDEBAR_LINKS;
use postboard_core::utils::{display_name, mask, truncate_string};
use postboard_core::{Route, Session};

use crate::app::{App, AppState, DashboardFocus, LoginFocus, RegisterFocus};

use super::styles;

/// Width of the text box drawn for each form field
const FIELD_WIDTH: usize = 30;

/// Width of the sidebar on protected screens
const SIDEBAR_WIDTH: u16 = 22;

pub fn render(frame: &mut Frame, app: &App) {
    match app.route {
        Route::Login => render_login(frame, app),
        Route::Register => render_register(frame, app),
        Route::Dashboard | Route::Profile => {
            // Nothing protected is drawn until the guard has rendered
            if let Some(ref session) = app.protected {
                render_shell(frame, app, session);
            }
        }
    }

    match app.state {
        AppState::ConfirmingDelete(_) => render_confirm_overlay(frame, "Are you sure?", "Delete this post"),
        AppState::ConfirmingQuit => render_confirm_overlay(frame, "Quit?", "Leave postboard"),
        AppState::Normal | AppState::Quitting => {}
    }
}

// ============================================================================
// Form helpers
// ============================================================================

fn field_lines(
    field: Field,
    value: &str,
    focused: bool,
    errors: &FormErrors,
) -> Vec<Line<'static>> {
    let shown = if field.is_secret() {
        mask(value, FIELD_WIDTH)
    } else {
        // Keep the tail visible while typing past the box width
        let count = value.chars().count();
        value.chars().skip(count.saturating_sub(FIELD_WIDTH)).collect()
    };
    let cursor = if focused { "▌" } else { " " };
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };

    let mut lines = vec![
        Line::from(Span::styled(format!("  {}", field.label()), styles::muted_style())),
        Line::from(vec![
            Span::styled("  [", styles::muted_style()),
            Span::styled(format!("{:<width$}{}", shown, cursor, width = FIELD_WIDTH), style),
            Span::styled("]", styles::muted_style()),
        ]),
    ];
    if let Some(message) = errors.get(field) {
        lines.push(Line::from(Span::styled(format!("  {}", message), styles::error_style())));
    }
    lines
}

fn button_line(label: &str, focused: bool) -> Line<'static> {
    if focused {
        Line::from(vec![
            Span::raw("  ["),
            Span::styled(format!(" ▶ {} ◀ ", label), styles::selected_style()),
            Span::raw("]"),
        ])
    } else {
        Line::from(vec![
            Span::raw("  ["),
            Span::styled(format!("   {}   ", label), styles::list_item_style()),
            Span::raw("]"),
        ])
    }
}

fn link_line(prompt: &str, label: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::highlight_style()
    };
    Line::from(vec![
        Span::styled(format!("  {} ", prompt), styles::muted_style()),
        Span::styled(label.to_string(), style),
    ])
}

fn render_card(frame: &mut Frame, title: &str, description: &str, mut body: Vec<Line<'static>>) {
    let mut lines = vec![
        Line::from(Span::styled(format!("  {}", title), styles::title_style())),
        Line::from(Span::styled(format!("  {}", description), styles::muted_style())),
        Line::from(""),
    ];
    lines.append(&mut body);

    let height = (lines.len() as u16).saturating_add(2);
    let area = centered_rect_fixed(48, height, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// ============================================================================
// Auth screens
// ============================================================================

fn render_login(frame: &mut Frame, app: &App) {
    let mut body = Vec::new();
    body.extend(field_lines(
        Field::EmailOrUsername,
        &app.login_form.email_or_username,
        app.login_focus == LoginFocus::EmailOrUsername,
        &app.login_errors,
    ));
    body.extend(field_lines(
        Field::Password,
        &app.login_form.password,
        app.login_focus == LoginFocus::Password,
        &app.login_errors,
    ));
    if let Some(ref error) = app.login_error {
        body.push(Line::from(Span::styled(format!("  {}", error), styles::error_style())));
    }
    body.push(Line::from(""));
    body.push(button_line("Login", app.login_focus == LoginFocus::Button));
    body.push(Line::from(""));
    body.push(link_line(
        "Don't have an account?",
        "Register",
        app.login_focus == LoginFocus::RegisterLink,
    ));

    render_card(frame, "Login", "Enter your credentials to access your account", body);
}

fn render_register(frame: &mut Frame, app: &App) {
    let mut body = Vec::new();
    for (field, value, focus) in [
        (Field::Email, &app.register_form.email, RegisterFocus::Email),
        (Field::Username, &app.register_form.username, RegisterFocus::Username),
        (Field::Password, &app.register_form.password, RegisterFocus::Password),
    ] {
        body.extend(field_lines(field, value, app.register_focus == focus, &app.register_errors));
    }
    if let Some(ref error) = app.register_error {
        body.push(Line::from(Span::styled(format!("  {}", error), styles::error_style())));
    }
    body.push(Line::from(""));
    body.push(button_line("Register", app.register_focus == RegisterFocus::Button));
    body.push(Line::from(""));
    body.push(link_line(
        "Already have an account?",
        "Login",
        app.register_focus == RegisterFocus::LoginLink,
    ));

    render_card(frame, "Register", "Create a new account", body);
}

// ============================================================================
// Protected screens
// ============================================================================

fn render_shell(frame: &mut Frame, app: &App, session: &Session) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Top bar
            Constraint::Min(10),   // Sidebar + content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_top_bar(frame, session, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(chunks[1]);

    render_sidebar(frame, app, body[0]);
    match app.route {
        Route::Dashboard => render_dashboard(frame, app, body[1]),
        Route::Profile => render_profile(frame, session, body[1]),
        Route::Login | Route::Register => {}
    }

    render_status_bar(frame, app, chunks[2]);
}

fn render_top_bar(frame: &mut Frame, session: &Session, area: Rect) {
    let title = "  Postboard";
    let identity = session.identity();
    let name = display_name(identity);
    let initial = identity.map(|i| i.initial()).unwrap_or('U');
    let right_len = name.chars().count() + 6;

    let line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.len() + right_len + 2),
        )),
        Span::styled(name.to_string(), styles::list_item_style()),
        Span::raw(" "),
        Span::styled(format!(" {} ", initial), styles::avatar_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![Line::from("")];
    for (i, route) in SIDEBAR_LINKS.iter().enumerate() {
        lines.push(Line::from(Span::styled(
            format!(" [{}] {:<14}", i + 1, route.title()),
            styles::nav_style(app.route == *route),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(" [l] ", styles::help_key_style()),
        Span::styled("Logout", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::RIGHT)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    // Create post form
    let mut lines = vec![
        Line::from(Span::styled("  Share your thoughts with the world", styles::muted_style())),
        Line::from(""),
    ];
    lines.extend(field_lines(
        Field::Title,
        &app.post_form.title,
        app.dashboard_focus == DashboardFocus::Title,
        &app.post_errors,
    ));
    lines.extend(field_lines(
        Field::Content,
        &app.post_form.content,
        app.dashboard_focus == DashboardFocus::Content,
        &app.post_errors,
    ));
    lines.push(Line::from(""));
    lines.push(button_line("Publish Post", app.dashboard_focus == DashboardFocus::Publish));

    let form_focused = app.dashboard_focus != DashboardFocus::Posts;
    let form_block = Block::default()
        .title(" Create Post ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(form_focused));
    frame.render_widget(Paragraph::new(lines).block(form_block), columns[0]);

    // Recent posts
    let list_focused = app.dashboard_focus == DashboardFocus::Posts;
    let width = columns[1].width.saturating_sub(6) as usize;
    let mut lines = Vec::new();
    if app.posts_loading && app.posts.is_empty() {
        lines.push(Line::from(Span::styled(" Loading posts...", styles::muted_style())));
    } else if app.posts.is_empty() {
        lines.push(Line::from(Span::styled(" No posts found.", styles::muted_style())));
    } else {
        for (i, post) in app.posts.iter().enumerate() {
            let selected = list_focused && i == app.post_selection;
            let title_style = if selected {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            lines.push(Line::from(Span::styled(
                format!(" {}", truncate_string(&post.title, width)),
                title_style,
            )));
            lines.push(Line::from(Span::styled(
                format!("   {}", post.byline()),
                styles::muted_style(),
            )));
            lines.push(Line::from(Span::styled(
                format!("   {}", truncate_string(&post.content, width)),
                styles::list_item_style(),
            )));
            if selected {
                lines.push(Line::from(vec![
                    Span::raw("   "),
                    Span::styled("[d] Delete", styles::destructive_style(true)),
                ]));
            }
            lines.push(Line::from(""));
        }
    }

    let list_block = Block::default()
        .title(" Recent Posts ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(list_focused));
    frame.render_widget(
        Paragraph::new(lines).block(list_block).wrap(Wrap { trim: false }),
        columns[1],
    );
}

fn render_profile(frame: &mut Frame, session: &Session, area: Rect) {
    let Some(identity) = session.identity() else {
        return;
    };

    let mut lines = vec![Line::from("")];
    for (label, value) in [
        ("Username", identity.username.as_str()),
        ("Email", identity.email.as_str()),
        ("Role", identity.role.as_str()),
    ] {
        lines.push(Line::from(Span::styled(format!("  {}", label), styles::muted_style())));
        lines.push(Line::from(vec![
            Span::styled("  [", styles::muted_style()),
            Span::styled(format!("{:<width$}", value, width = FIELD_WIDTH), styles::list_item_style()),
            Span::styled("]", styles::muted_style()),
        ]));
    }

    let block = Block::default()
        .title(" User Information ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = if app.editing_text() {
        "[tab] next | [esc] done"
    } else {
        "[tab] form | [r]efresh | [q]uit"
    };

    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => format!(" {} ", app.route.path()),
    };
    let right_text = format!(" {} ", shortcuts);

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.len())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(Paragraph::new(status_line).style(styles::status_bar_style()), area);
}

// ============================================================================
// Overlays
// ============================================================================

fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_confirm_overlay(frame: &mut Frame, question: &str, detail: &str) {
    let area = centered_rect_fixed(34, 6, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled(format!(" {}", question), styles::title_style())),
        Line::from(Span::styled(format!(" {}", detail), styles::muted_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled(" [y]", styles::help_key_style()),
            Span::raw("es  "),
            Span::styled("[n]", styles::help_key_style()),
            Span::raw("o"),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
