//! Rendering of message bodies and attachments against recording doubles.

mod common;

use base64::Engine;

use common::{attachment, message, png, Fixture, RecordingTerminal, ScriptedPrompter, Shown, StubTransport};
use mailshell::model::{Body, EmailAddress};
use mailshell::render::html::render_html;
use mailshell::render::locations::LocationMap;
use mailshell::render::message::BodyReport;
use mailshell::render::plain::render_plain;
use mailshell::render::MessageRenderer;

#[test]
fn test_cid_images_share_a_slot_and_failed_fetch_is_skipped() {
    let fx = Fixture::new();
    let transport = StubTransport::default();
    let mut terminal = RecordingTerminal::default();
    let mut prompter = ScriptedPrompter::new(&[]);
    let image = png(4, 4);
    let attachments = vec![attachment(Some("logo.png"), Some("<abc>"), image.clone())];
    let html = concat!(
        r#"<p>Intro</p><img src="cid:abc">"#,
        r#"<p>Middle</p><img src="https://x/y.png">"#,
        r#"<p>More</p><img src="cid:abc"><p>End</p>"#
    );

    let mut locations = LocationMap::new();
    let report = {
        let mut ctx = fx.context(&transport, &mut terminal, &mut prompter);
        render_html(html, &attachments, &mut ctx, &mut locations).unwrap()
    };

    assert_eq!(report.images_shown, vec![0, 0]);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.literal_chunks, 4);
    assert!(report.saved.is_empty());
    assert_eq!(
        terminal.shown,
        vec![
            Shown::Html("<p>Intro</p>".into()),
            Shown::Image(image.clone()),
            Shown::Html("<p>Middle</p>".into()),
            Shown::Html("<p>More</p>".into()),
            Shown::Image(image),
            Shown::Html("<p>End</p>".into()),
        ]
    );
    assert_eq!(transport.requested(), vec!["https://x/y.png"]);
    // Attachment images are never offered again as inline saves
    assert!(prompter.prompts.is_empty());

    // Only the materialized attachment is still tracked; the failed slot left nothing
    assert!(locations.contains("logo.png"));
    assert_eq!(fx.leftovers().len(), 1);
    drop(locations);
    assert!(fx.leftovers().is_empty());
}

#[test]
fn test_literal_chunks_are_images_plus_one() {
    let fx = Fixture::new();
    let transport = StubTransport::default()
        .with("https://img.example/a.png", png(5, 5))
        .with("https://img.example/b.png", png(6, 6));
    let mut terminal = RecordingTerminal::default();
    let mut prompter = ScriptedPrompter::new(&["N"]);
    let html = concat!(
        "<div>one</div>",
        r#"<img src="https://img.example/a.png">"#,
        "<div>two</div>",
        r#"<img src="https://img.example/b.png">"#,
        "<div>three</div>",
        r#"<img src="https://img.example/a.png">"#,
        "<div>four</div>"
    );

    let mut locations = LocationMap::new();
    let report = {
        let mut ctx = fx.context(&transport, &mut terminal, &mut prompter);
        render_html(html, &[], &mut ctx, &mut locations).unwrap()
    };

    assert_eq!(report.images_shown, vec![0, 1, 0]);
    assert_eq!(report.literal_chunks, report.images_shown.len() + 1);
    assert_eq!(
        terminal.html_chunks(),
        vec!["<div>one</div>", "<div>two</div>", "<div>three</div>", "<div>four</div>"]
    );
    // Each distinct URL is fetched once
    assert_eq!(
        transport.requested(),
        vec!["https://img.example/a.png", "https://img.example/b.png"]
    );
    // Declined: both downloads are deleted immediately
    assert!(fx.leftovers().is_empty());
    assert!(terminal.html_paths.iter().all(|p| !p.exists()));
}

#[test]
fn test_relative_url_resolves_against_previous_origin() {
    let fx = Fixture::new();
    let transport = StubTransport::default()
        .with("https://cdn.example.com/x.png", png(3, 3))
        .with("https://cdn.example.com/img/a.png", png(7, 3));
    let mut terminal = RecordingTerminal::default();
    let mut prompter = ScriptedPrompter::new(&["N"]);
    let html = r#"<img src="https://cdn.example.com/x.png"><p>and</p><img src="/img/a.png">"#;

    let mut locations = LocationMap::new();
    let report = {
        let mut ctx = fx.context(&transport, &mut terminal, &mut prompter);
        render_html(html, &[], &mut ctx, &mut locations).unwrap()
    };

    assert_eq!(
        transport.requested(),
        vec![
            "https://cdn.example.com/img/a.png",
            "https://cdn.example.com/x.png"
        ]
    );
    assert_eq!(report.images_shown, vec![0, 1]);
    assert_eq!(terminal.images(), vec![&png(3, 3), &png(7, 3)]);
}

#[test]
fn test_inline_save_prompt_keeps_chosen_images() {
    let fx = Fixture::new();
    let remote = png(8, 8);
    let embedded = png(2, 3);
    let transport = StubTransport::default()
        .with("https://img.example/photo.png", remote.clone())
        .with("https://track.example/p.gif", png(1, 1));
    let mut terminal = RecordingTerminal::default();
    let mut prompter = ScriptedPrompter::new(&["Y", "S", "", "D"]);
    let data = base64::engine::general_purpose::STANDARD.encode(&embedded);
    let html = format!(
        concat!(
            r#"<p>a</p><img src="https://img.example/photo.png">"#,
            r#"<img src="https://track.example/p.gif" width=1 height=1>"#,
            r#"<p>b</p><img src="data:image/png;base64,{}"><p>c</p>"#
        ),
        data
    );

    let mut locations = LocationMap::new();
    let report = {
        let mut ctx = fx.context(&transport, &mut terminal, &mut prompter);
        render_html(&html, &[], &mut ctx, &mut locations).unwrap()
    };

    // The tracking pixel is neither shown nor offered
    assert_eq!(report.images_shown, vec![0, 2]);
    assert_eq!(report.skipped, 1);
    assert_eq!(terminal.images(), vec![&remote, &embedded]);

    let saved = fx.downloads().join("inline-image-1");
    assert_eq!(report.saved, vec![saved.clone()]);
    assert_eq!(std::fs::read(&saved).unwrap(), remote);
    assert!(prompter
        .prompts
        .iter()
        .any(|p| p.contains("2 inline image(s)")));

    drop(locations);
    assert!(fx.leftovers().is_empty());
    assert!(saved.exists());
}

#[test]
fn test_unknown_cid_leaves_empty_slot() {
    let fx = Fixture::new();
    let transport = StubTransport::default();
    let mut terminal = RecordingTerminal::default();
    let mut prompter = ScriptedPrompter::new(&[]);
    let attachments = vec![attachment(Some("a.png"), Some("<abc>"), png(4, 4))];

    let mut locations = LocationMap::new();
    let report = {
        let mut ctx = fx.context(&transport, &mut terminal, &mut prompter);
        render_html(r#"<p>x</p><img src="cid:other">"#, &attachments, &mut ctx, &mut locations)
            .unwrap()
    };

    assert!(report.images_shown.is_empty());
    assert_eq!(report.skipped, 1);
    assert!(locations.is_empty());
    assert!(transport.requested().is_empty());
}

#[test]
fn test_plain_text_placeholder_shows_attachment() {
    let fx = Fixture::new();
    let transport = StubTransport::default();
    let mut terminal = RecordingTerminal::default();
    let mut prompter = ScriptedPrompter::new(&[]);
    let photo = png(6, 4);
    let msg = message(
        "1",
        Body::PlainText("Hi Bob,\nhere it is [image: photo.png] enjoy\nBye".into()),
        vec![
            attachment(Some("notes.txt"), None, b"text".to_vec()),
            attachment(Some("photo.png"), None, photo.clone()),
        ],
    );

    let mut locations = LocationMap::new();
    let report = {
        let ctx = fx.context(&transport, &mut terminal, &mut prompter);
        MessageRenderer::new(ctx)
            .render_body(&msg, &mut locations)
            .unwrap()
    };

    match report {
        BodyReport::Plain(plain) => assert_eq!(plain.images_shown, vec!["photo.png"]),
        other => panic!("expected plain report, got {other:?}"),
    }
    assert!(locations.contains("photo.png"));
    assert_eq!(terminal.images(), vec![&photo]);
    assert_eq!(
        terminal.texts(),
        vec!["Hi Bob,", "here it is ", " enjoy", "Bye"]
    );

    drop(locations);
    assert!(fx.leftovers().is_empty());
}

#[test]
fn test_plain_text_cid_placeholders() {
    let fx = Fixture::new();
    let transport = StubTransport::default();
    let mut terminal = RecordingTerminal::default();
    let mut prompter = ScriptedPrompter::new(&[]);
    let gmail = png(3, 3);
    let outlook = png(4, 3);
    let attachments = vec![
        attachment(None, Some("<ii_abc>"), gmail.clone()),
        attachment(Some("image001.png"), Some("<image001.png@01D9>"), outlook.clone()),
    ];
    let text = "[image: cid:ii_abc@f00d]\nmiddle\n[cid:image001.png@01D9]";

    let mut locations = LocationMap::new();
    let report = {
        let mut ctx = fx.context(&transport, &mut terminal, &mut prompter);
        render_plain(text, &attachments, &mut ctx, &mut locations).unwrap()
    };

    assert_eq!(report.images_shown, vec!["ii_abc", "image001.png"]);
    assert_eq!(terminal.images(), vec![&gmail, &outlook]);
    assert_eq!(terminal.texts(), vec!["middle"]);
}

#[test]
fn test_malformed_placeholder_falls_back_to_first_image() {
    let fx = Fixture::new();
    let transport = StubTransport::default();
    let mut terminal = RecordingTerminal::default();
    let mut prompter = ScriptedPrompter::new(&[]);
    let image = png(5, 2);
    let attachments = vec![
        attachment(Some("readme.txt"), None, b"not an image".to_vec()),
        attachment(Some("scan.png"), None, image.clone()),
    ];

    let mut locations = LocationMap::new();
    let report = {
        let mut ctx = fx.context(&transport, &mut terminal, &mut prompter);
        render_plain("[image: cid:broken]", &attachments, &mut ctx, &mut locations).unwrap()
    };

    assert_eq!(report.images_shown, vec!["scan.png"]);
    assert_eq!(terminal.images(), vec![&image]);
}

#[test]
fn test_long_plain_text_asks_how_much_to_show() {
    let mut fx = Fixture::new();
    fx.settings.plain_text_threshold = 10;
    let transport = StubTransport::default();
    let mut terminal = RecordingTerminal::default();
    let mut prompter = ScriptedPrompter::new(&["5"]);

    let mut locations = LocationMap::new();
    {
        let mut ctx = fx.context(&transport, &mut terminal, &mut prompter);
        render_plain("0123456789ABCDEFGHIJ", &[], &mut ctx, &mut locations).unwrap();
    }

    assert_eq!(terminal.texts(), vec!["01234"]);
    assert!(prompter.prompts[0].contains("20 characters"));
}

#[test]
fn test_attachment_loop_prints_and_downloads() {
    let fx = Fixture::new();
    let transport = StubTransport::default();
    let mut terminal = RecordingTerminal::default();
    let photo = png(4, 4);
    let msg = message(
        "7",
        Body::PlainText("See attached".into()),
        vec![
            attachment(Some("notes.txt"), None, b"first line\nsecond line".to_vec()),
            attachment(Some("photo.png"), None, photo.clone()),
            attachment(Some("blob.bin"), None, vec![0, 159, 146, 150]),
        ],
    );
    let mut prompter = ScriptedPrompter::new(&[
        "Y", "N", // notes.txt: print, no download
        "Y", "Y", "", // photo.png: print, download to default
        "Y", "Y", "", // blob.bin: cannot print, download to default
    ]);

    let report = {
        let ctx = fx.context(&transport, &mut terminal, &mut prompter);
        MessageRenderer::new(ctx).render(&msg).unwrap()
    };

    let photo_path = fx.downloads().join("photo.png");
    let blob_path = fx.downloads().join("blob.bin");
    assert_eq!(report.downloaded, vec![photo_path.clone(), blob_path.clone()]);
    assert_eq!(std::fs::read(&photo_path).unwrap(), photo);
    assert_eq!(std::fs::read(&blob_path).unwrap(), vec![0, 159, 146, 150]);

    let texts = terminal.texts();
    assert!(texts.contains(&"first line"));
    assert!(texts.contains(&"second line"));
    assert_eq!(terminal.images(), vec![&photo]);
    assert!(terminal.shown.contains(&Shown::Notice(
        "This attachment is binary and cannot be printed".into()
    )));
    assert!(terminal
        .shown
        .contains(&Shown::Notice("From: Alice <alice@example.com>".into())));
    assert!(terminal
        .shown
        .contains(&Shown::Notice("Date: 2024-01-02 10:00 UTC".into())));

    // The printed photo was moved, not copied
    assert!(fx.leftovers().is_empty());
}

#[test]
fn test_download_never_overwrites() {
    let fx = Fixture::new();
    std::fs::write(fx.downloads().join("report.pdf"), b"old").unwrap();
    let transport = StubTransport::default();
    let mut terminal = RecordingTerminal::default();
    let mut prompter = ScriptedPrompter::new(&["N", "Y", ""]);
    let msg = message(
        "8",
        Body::PlainText("pdf".into()),
        vec![attachment(Some("report.pdf"), None, b"%PDF-1.7".to_vec())],
    );

    let report = {
        let ctx = fx.context(&transport, &mut terminal, &mut prompter);
        MessageRenderer::new(ctx).render(&msg).unwrap()
    };

    let expected = fx.downloads().join("report_1.pdf");
    assert_eq!(report.downloaded, vec![expected.clone()]);
    assert_eq!(std::fs::read(fx.downloads().join("report.pdf")).unwrap(), b"old");
    assert_eq!(std::fs::read(expected).unwrap(), b"%PDF-1.7");
}

#[test]
fn test_html_message_end_to_end_cleans_up() {
    let fx = Fixture::new();
    let transport = StubTransport::default().with("https://img.example/a.png", png(9, 9));
    let mut terminal = RecordingTerminal::default();
    let mut prompter = ScriptedPrompter::new(&["N", "N", "N"]);
    let msg = message(
        "9",
        Body::Html {
            html: r#"<h1>News</h1><img src="https://img.example/a.png"><img src="cid:logo">"#.into(),
            text: None,
        },
        vec![attachment(Some("logo.png"), Some("<logo>"), png(4, 4))],
    );

    let report = {
        let ctx = fx.context(&transport, &mut terminal, &mut prompter);
        MessageRenderer::new(ctx).render(&msg).unwrap()
    };

    match report.body {
        BodyReport::Html(html) => assert_eq!(html.images_shown, vec![0, 1]),
        other => panic!("expected html report, got {other:?}"),
    }
    assert!(report.downloaded.is_empty());
    assert!(fx.leftovers().is_empty());
}

#[test]
fn test_header_lists_every_recipient_field() {
    let fx = Fixture::new();
    let transport = StubTransport::default();
    let mut terminal = RecordingTerminal::default();
    let mut prompter = ScriptedPrompter::new(&[]);
    let mut msg = message("8", Body::PlainText("hi".into()), Vec::new());
    msg.bcc = vec![EmailAddress::bare("dave@example.com")];

    {
        let ctx = fx.context(&transport, &mut terminal, &mut prompter);
        MessageRenderer::new(ctx).print_header(&msg);
    }

    assert_eq!(
        terminal.shown,
        vec![
            Shown::Notice("From: Alice <alice@example.com>".into()),
            Shown::Notice("To: me@example.com".into()),
            Shown::Notice("CC: carol@example.com".into()),
            Shown::Notice("BCC: dave@example.com".into()),
            Shown::Notice("Date: 2024-01-02 10:00 UTC".into()),
            Shown::Notice("Subject: Pictures".into()),
        ]
    );

    // Without bcc the line is left out
    msg.bcc.clear();
    let mut terminal = RecordingTerminal::default();
    {
        let ctx = fx.context(&transport, &mut terminal, &mut prompter);
        MessageRenderer::new(ctx).print_header(&msg);
    }
    assert!(!terminal
        .shown
        .iter()
        .any(|s| matches!(s, Shown::Notice(n) if n.starts_with("BCC:"))));
}
