use super::*;

fn prose(len: usize) -> String {
    "plain words here. ".chars().cycle().take(len).collect()
}

// ---------------------------------------------------------------
// Binary detection
// ---------------------------------------------------------------

#[test]
fn empty_text_is_not_binary() {
    assert!(!is_binary(""));
}

#[test]
fn mostly_nul_text_is_binary() {
    let text = format!("{}{}", "\0".repeat(20), "a".repeat(80));
    assert!(is_binary(&text));
    assert_eq!(sanitize(&text, 3000), BINARY_PLACEHOLDER);
}

#[test]
fn exactly_ten_percent_is_not_binary() {
    let text = format!("{}{}", "\x01".repeat(10), "a".repeat(90));
    assert!(!is_binary(&text));
}

#[test]
fn whitespace_controls_do_not_count() {
    let text = "line\n\tindented\r\n".repeat(50);
    assert!(!is_binary(&text));
}

#[test]
fn only_the_first_2000_chars_are_sampled() {
    let text = format!("{}{}", "a".repeat(2000), "\0".repeat(5000));
    assert!(!is_binary(&text));
}

#[test]
fn binary_verdict_is_stable() {
    let text = format!("{}{}", "\x02".repeat(300), prose(700));
    assert_eq!(is_binary(&text), is_binary(&text));
}

// ---------------------------------------------------------------
// Escape sequences
// ---------------------------------------------------------------

#[test]
fn strips_csi_and_osc_sequences() {
    let text = format!("\x1b[31m{}\x1b[0m \x1b]0;title\x07done", prose(200));
    let out = sanitize(&text, 3000);
    assert!(!out.contains('\x1b'));
    assert!(!out.contains('\x07'));
    assert!(out.ends_with(" done"));
}

#[test]
fn color_codes_inside_a_blob_do_not_hide_it() {
    let blob = "QUJD".repeat(30);
    let text = format!("{} \x1b[32m{}\x1b[0m{} tail", prose(400), &blob[..60], &blob[60..]);
    let out = sanitize(&text, 3000);
    assert!(out.contains("[base64 data filtered, ~90 bytes]"), "got: {out}");
    assert!(out.ends_with(" tail"));
}

// ---------------------------------------------------------------
// Blobs
// ---------------------------------------------------------------

#[test]
fn base64_of_100_chars_is_replaced() {
    let text = format!("before {} after", "A".repeat(100));
    assert_eq!(
        sanitize(&text, 3000),
        "before [base64 data filtered, ~75 bytes] after"
    );
}

#[test]
fn base64_of_99_chars_is_kept() {
    let text = format!("before {} after", "A".repeat(99));
    assert_eq!(sanitize(&text, 3000), text);
}

#[test]
fn base64_padding_is_included_in_the_match() {
    let text = format!("{}AB==", "Zm9v".repeat(25));
    assert_eq!(filter_blobs(&text), "[base64 data filtered, ~78 bytes]");
}

#[test]
fn data_uri_reports_mime_and_size() {
    let text = "img: data:image/png;base64,iVBORw0KGgo= end";
    assert_eq!(
        filter_blobs(text),
        "img: [data URI filtered: image/png, ~9 bytes] end"
    );
}

#[test]
fn long_data_uri_is_replaced_once() {
    let text = format!("data:application/pdf;base64,{}", "JVBE".repeat(50));
    let out = filter_blobs(&text);
    assert_eq!(out, "[data URI filtered: application/pdf, ~150 bytes]");
}

// ---------------------------------------------------------------
// System reminders
// ---------------------------------------------------------------

#[test]
fn collapses_multiline_system_reminders() {
    let text = "keep\n<system-reminder>\nline one\nline two\n</system-reminder>\nalso keep";
    assert_eq!(
        sanitize(text, 3000),
        "keep\n[system reminder collapsed]\nalso keep"
    );
}

#[test]
fn reminders_are_matched_non_greedily() {
    let text = "<system-reminder>a</system-reminder> mid <system-reminder>b</system-reminder>";
    assert_eq!(
        strip_system_reminders(text),
        "[system reminder collapsed] mid [system reminder collapsed]"
    );
}

#[test]
fn blob_inside_reminder_collapses_with_it() {
    let text = format!("<system-reminder>{}</system-reminder>", "A".repeat(120));
    assert_eq!(sanitize(&text, 3000), REMINDER_PLACEHOLDER);
}

// ---------------------------------------------------------------
// Truncation
// ---------------------------------------------------------------

#[test]
fn truncates_with_trailing_note() {
    let out = sanitize(&"x".repeat(50), 10);
    assert_eq!(out, format!("{}\n\n... [40 more chars truncated]", "x".repeat(10)));
}

#[test]
fn text_at_limit_is_untouched() {
    let text = "y".repeat(10);
    assert_eq!(sanitize(&text, 10), text);
}

#[test]
fn truncation_counts_characters_not_bytes() {
    let text = "é".repeat(12);
    let out = sanitize(&text, 5);
    assert!(out.starts_with("ééééé\n\n"));
    assert!(out.ends_with("[7 more chars truncated]"));
}

#[test]
fn output_head_never_exceeds_limit() {
    for limit in [0, 1, 17, 250] {
        let out = sanitize(&prose(1000), limit);
        let head = out.split("\n\n... [").next().unwrap();
        assert!(head.chars().count() <= limit);
    }
}

#[test]
fn truncate_chars_appends_ellipsis() {
    assert_eq!(truncate_chars("abcdef", 3), "abc...");
    assert_eq!(truncate_chars("abc", 3), "abc");
}

#[test]
fn split_chars_reports_remaining_count() {
    assert_eq!(split_chars("hello world", 5), ("hello", 6));
    assert_eq!(split_chars("hi", 5), ("hi", 0));
}
