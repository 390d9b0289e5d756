use super::*;

fn hi_view(state: ConversationState) -> ChatView {
    render(&[Message::user("hi")], &state, &RenderOptions::default())
}

#[test]
fn single_message_renders_with_role_class_and_progress() {
    let view = hi_view(ConversationState::new(false, 0.4));

    let messages: Vec<_> = view.message_nodes().collect();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].class_attr(), "chat-message user");
    assert_eq!(messages[0].inner_html, "hi");
    assert_eq!(view.typing_indicator_count(), 0);
    assert_eq!(view.progress_width(), Some("40%"));
    assert_eq!(
        view.to_html(),
        "<div class=\"chat-message user\">hi</div>\
         <div class=\"mood-bar\"><div class=\"mood-progress\" style=\"width: 40%;\"></div></div>"
    );
}

#[test]
fn typing_indicator_follows_all_messages() {
    let messages = vec![
        Message::user("Joseph: hello"),
        Message::companion("Monika: hey you"),
    ];
    let view = render(
        &messages,
        &ConversationState::new(true, 0.5),
        &RenderOptions::default(),
    );

    assert_eq!(view.typing_indicator_count(), 1);
    let indicator_at = view
        .nodes
        .iter()
        .position(|n| n.has_class(TYPING_INDICATOR_CLASS))
        .expect("indicator");
    let last_message_at = view
        .nodes
        .iter()
        .rposition(|n| n.has_class(MESSAGE_CLASS))
        .expect("message");
    assert!(indicator_at > last_message_at);
    assert_eq!(view.nodes[indicator_at].inner_html, DEFAULT_TYPING_LABEL);
    assert!(view.nodes.last().expect("bar").has_class(MOOD_BAR_CLASS));
}

#[test]
fn empty_transcript_still_shows_mood_bar() {
    let view = render(&[], &ConversationState::default(), &RenderOptions::default());
    assert_eq!(view.message_count(), 0);
    assert_eq!(view.nodes.len(), 1);
    assert_eq!(view.progress_width(), Some("0%"));
}

#[test]
fn trusted_policy_keeps_markup_and_escaped_policy_neutralizes_it() {
    let messages = vec![Message::companion("<b>hey</b><script>alert(1)</script>")];
    let state = ConversationState::default();

    let trusted = render(&messages, &state, &RenderOptions::default());
    assert!(trusted.to_html().contains("<script>alert(1)</script>"));

    let escaped = render(
        &messages,
        &state,
        &RenderOptions {
            content_policy: ContentPolicy::Escaped,
            ..RenderOptions::default()
        },
    );
    let html = escaped.to_html();
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
}

#[test]
fn render_is_idempotent_for_identical_inputs() {
    let messages = vec![Message::user("again")];
    let state = ConversationState::new(true, 0.75);
    let options = RenderOptions::default();
    assert_eq!(
        render(&messages, &state, &options),
        render(&messages, &state, &options)
    );
}

fn progress(value: f64) -> ConversationState {
    ConversationState::new(false, value)
}

#[test]
fn percent_formatting_drops_float_noise() {
    assert_eq!(format_progress(&progress(0.4)), "40");
    assert_eq!(format_progress(&progress(1.0)), "100");
    assert_eq!(format_progress(&progress(0.125)), "12.5");
    assert_eq!(format_progress(&progress(0.0)), "0");
    assert_eq!(format_progress(&progress(f64::NAN)), "0");
}

#[test]
fn plain_text_strips_markup_and_draws_bar() {
    let view = render(
        &[Message::companion("Monika: <i>hi</i> &amp; bye")],
        &ConversationState::new(true, 0.5),
        &RenderOptions::default(),
    );
    assert_eq!(
        view.to_plain_text(),
        "Monika: hi & bye\n... Monika is typing...\n[##########----------] 50%"
    );
}

#[test]
fn content_policy_parses_from_settings_strings() {
    assert_eq!("escaped".parse::<ContentPolicy>(), Ok(ContentPolicy::Escaped));
    assert_eq!(" Trusted ".parse::<ContentPolicy>(), Ok(ContentPolicy::Trusted));
    assert!("loose".parse::<ContentPolicy>().is_err());
}
