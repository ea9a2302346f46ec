/*
 * compose_pipeline.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration tests for the compose service: request resolution, draft conversion, forwarding,
 * template replies and session bookkeeping, driven against recording fakes of the message store,
 * retrieval service, MIME converter and compose host.
 *
 * Run with:
 *   cargo test -p missiva_core --test compose_pipeline
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use missiva_core::compose::{
    ComposeContext, ComposeError, ComposeFields, ComposeFormat, ComposeRequest, ComposeService, ComposeType,
    ForwardMode, HtmlSanitizer, MessageWindow, OriginalMessage, ReplyKind, ReplyStatus, ResolutionTarget,
    ResolvedParams, SelectionSource, SessionArena, SessionHandle, StoredMessageKind, SurfaceId,
};
use missiva_core::config::{
    PrefValue, PreferenceStore, Preferences, PREF_FORWARD_MESSAGE_MODE, PREF_GLOBAL_HTML_DOMAINS,
    PREF_GLOBAL_HTML_DOMAINS_VERSION, PREF_HTML_DOMAINS, PREF_REPLY_QUOTING_SELECTION,
};
use missiva_core::identity::{AccountKey, AccountList, Identity, ServerKey};
use missiva_core::store::{
    ChunkCallback, CompletionCallback, ComposeHost, ConverterSettings, DispositionState, DraftOutcome,
    DraftResultCallback, MessageDatabase, MessageFolder, MessageHeader, MessageRetrievalService, MessageServices,
    MessageStore, MessageUrl, MimeConverter, MimeConverterFactory, OpenedCallback, SentCallback, StoreError,
};

const INBOX: &str = "mailbox://me@host/Inbox";
const TEMPLATES: &str = "mailbox://me@host/Templates";
const TEMPLATE_REF: &str = "mailbox://me@host/Templates?messageId=tmpl@example.com&subject=Away";

// ---- fakes ----

#[derive(Default)]
struct FakeRetrieval {
    chunks: Mutex<Vec<Vec<u8>>>,
    failure: Mutex<Option<StoreError>>,
    streamed: Mutex<Vec<(String, bool)>>,
    displayed: Mutex<Vec<(String, Option<String>)>>,
    url_lookups: Mutex<Vec<String>>,
}

impl FakeRetrieval {
    fn set_chunks(&self, chunks: &[&[u8]]) {
        *self.chunks.lock().unwrap() = chunks.iter().map(|c| c.to_vec()).collect();
    }

    fn deliver(&self, on_chunk: ChunkCallback, on_complete: CompletionCallback) {
        let chunks = self.chunks.lock().unwrap().clone();
        for chunk in &chunks {
            on_chunk(chunk);
        }
        let failure = self.failure.lock().unwrap().take();
        on_complete(match failure {
            Some(e) => Err(e),
            None => Ok(()),
        });
    }
}

impl MessageRetrievalService for FakeRetrieval {
    fn url_for_uri(&self, uri: &str, _surface: Option<SurfaceId>) -> Result<MessageUrl, StoreError> {
        self.url_lookups.lock().unwrap().push(uri.to_string());
        Ok(MessageUrl::new(format!("resolved:{}", uri)))
    }

    fn stream_message(
        &self,
        uri: &str,
        _surface: Option<SurfaceId>,
        convert_data: bool,
        on_chunk: ChunkCallback,
        on_complete: CompletionCallback,
    ) -> Result<(), StoreError> {
        self.streamed.lock().unwrap().push((uri.to_string(), convert_data));
        self.deliver(on_chunk, on_complete);
        Ok(())
    }

    fn display_message(
        &self,
        uri: &str,
        _surface: Option<SurfaceId>,
        charset: Option<&str>,
        on_chunk: ChunkCallback,
        on_complete: CompletionCallback,
    ) -> Result<(), StoreError> {
        self.displayed
            .lock()
            .unwrap()
            .push((uri.to_string(), charset.map(str::to_string)));
        self.deliver(on_chunk, on_complete);
        Ok(())
    }
}

struct FakeServices {
    retrieval: Arc<FakeRetrieval>,
}

impl MessageServices for FakeServices {
    fn service_for_uri(&self, uri: &str) -> Result<Arc<dyn MessageRetrievalService>, StoreError> {
        if uri.starts_with("unknown:") {
            return Err(StoreError::new(format!("no service for {}", uri)));
        }
        Ok(self.retrieval.clone())
    }
}

#[derive(Default)]
struct ConverterLog {
    settings: Vec<ConverterSettings>,
    urls: Vec<MessageUrl>,
    received: Vec<u8>,
    finished: Vec<Result<(), String>>,
}

struct FakeConverter {
    log: Arc<Mutex<ConverterLog>>,
    handle: SessionHandle,
    forward: bool,
    on_result: Option<DraftResultCallback>,
}

impl MimeConverter for FakeConverter {
    fn configure(&mut self, settings: ConverterSettings) {
        self.forward = settings.forward_inline_filter;
        self.log.lock().unwrap().settings.push(settings);
    }

    fn async_convert(&mut self, url: &MessageUrl, on_result: DraftResultCallback) -> Result<(), StoreError> {
        self.log.lock().unwrap().urls.push(url.clone());
        self.on_result = Some(on_result);
        Ok(())
    }

    fn receive(&mut self, data: &[u8]) -> Result<(), StoreError> {
        self.log.lock().unwrap().received.extend_from_slice(data);
        Ok(())
    }

    fn finish(&mut self, status: Result<(), StoreError>) {
        self.log
            .lock()
            .unwrap()
            .finished
            .push(status.as_ref().map(|_| ()).map_err(|e| e.to_string()));
        if let Some(on_result) = self.on_result.take() {
            on_result(match status {
                Ok(()) if self.forward => Ok(DraftOutcome::Forwarded),
                Ok(()) => Ok(DraftOutcome::Opened(self.handle)),
                Err(e) => Err(e),
            });
        }
    }
}

struct FakeConverters {
    log: Arc<Mutex<ConverterLog>>,
    handle: SessionHandle,
}

impl MimeConverterFactory for FakeConverters {
    fn create_converter(&self) -> Result<Box<dyn MimeConverter>, StoreError> {
        Ok(Box::new(FakeConverter {
            log: Arc::clone(&self.log),
            handle: self.handle,
            forward: false,
            on_result: None,
        }))
    }
}

struct FakeDatabase {
    messages: Vec<MessageHeader>,
}

impl MessageDatabase for FakeDatabase {
    fn header_for_message_id(&self, message_id: &str) -> Option<MessageHeader> {
        self.messages.iter().find(|h| h.message_id == message_id).cloned()
    }
}

struct FakeFolder {
    uri: String,
    database: Arc<FakeDatabase>,
    marks: Mutex<Vec<(String, DispositionState)>>,
}

impl FakeFolder {
    fn new(uri: &str, messages: Vec<MessageHeader>) -> Arc<Self> {
        Arc::new(Self {
            uri: uri.to_string(),
            database: Arc::new(FakeDatabase { messages }),
            marks: Mutex::new(Vec::new()),
        })
    }

    fn marks(&self) -> Vec<(String, DispositionState)> {
        self.marks.lock().unwrap().clone()
    }
}

impl MessageFolder for FakeFolder {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn message_database(&self) -> Result<Arc<dyn MessageDatabase>, StoreError> {
        Ok(self.database.clone())
    }

    fn uri_for_message(&self, header: &MessageHeader) -> String {
        format!("{}#{}", self.uri.replace("mailbox://", "mailbox-message://"), header.key)
    }

    fn add_disposition_state(&self, header: &MessageHeader, state: DispositionState) -> Result<(), StoreError> {
        self.marks.lock().unwrap().push((header.message_id.clone(), state));
        Ok(())
    }
}

struct FakeStore {
    folders: HashMap<String, Arc<FakeFolder>>,
}

impl MessageStore for FakeStore {
    fn existing_folder(&self, uri: &str) -> Result<Arc<dyn MessageFolder>, StoreError> {
        match self.folders.get(uri) {
            Some(folder) => Ok(folder.clone()),
            None => Err(StoreError::new(format!("no folder {}", uri))),
        }
    }
}

#[derive(Default)]
struct FakeHost {
    opened: Mutex<Vec<(ResolvedParams, OpenedCallback)>>,
    sent: Mutex<Vec<(ResolvedParams, Option<SurfaceId>, SentCallback)>>,
    arguments: Mutex<Vec<String>>,
}

impl FakeHost {
    fn take_opened(&self) -> Vec<(ResolvedParams, OpenedCallback)> {
        std::mem::take(&mut *self.opened.lock().unwrap())
    }

    fn take_sent(&self) -> Vec<(ResolvedParams, Option<SurfaceId>, SentCallback)> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

impl ComposeHost for FakeHost {
    fn open_compose_window(&self, _chrome: Option<&str>, params: ResolvedParams, on_opened: OpenedCallback) {
        self.opened.lock().unwrap().push((params, on_opened));
    }

    fn open_compose_window_with_argument(&self, argument: &str) -> Result<(), StoreError> {
        self.arguments.lock().unwrap().push(argument.to_string());
        Ok(())
    }

    fn send_now(&self, params: ResolvedParams, parent: Option<SurfaceId>, on_sent: SentCallback) {
        self.sent.lock().unwrap().push((params, parent, on_sent));
    }
}

struct Passthrough;

impl HtmlSanitizer for Passthrough {
    fn sanitize(&self, html: &str) -> Result<String, StoreError> {
        Ok(html.to_string())
    }
}

struct FakeSelection {
    text: &'static str,
    html: &'static str,
}

impl SelectionSource for FakeSelection {
    fn selection_text(&self) -> String {
        self.text.to_string()
    }

    fn selection_html(&self) -> Result<String, StoreError> {
        Ok(self.html.to_string())
    }
}

// ---- harness ----

struct Harness {
    service: ComposeService,
    prefs: Arc<Preferences>,
    host: Arc<FakeHost>,
    retrieval: Arc<FakeRetrieval>,
    converter_log: Arc<Mutex<ConverterLog>>,
    inbox: Arc<FakeFolder>,
    draft_handle: SessionHandle,
}

fn me() -> Identity {
    Identity::new("id1", "me@example.com")
}

fn original() -> MessageHeader {
    MessageHeader {
        folder_uri: INBOX.into(),
        key: 1,
        message_id: "orig@example.org".into(),
        author: "Ann <ann@example.org>".into(),
        recipients: "me@example.com".into(),
        subject: "Question".into(),
        ..Default::default()
    }
}

fn harness_with_prefs(prefs: Preferences) -> Harness {
    let prefs = Arc::new(prefs);
    let accounts = AccountList::new();
    accounts
        .add_account(
            AccountKey("account1".into()),
            ServerKey("server1".into()),
            vec![me(), Identity::new("id2", "alias@example.com")],
        )
        .unwrap();
    let template = MessageHeader {
        folder_uri: TEMPLATES.into(),
        key: 9,
        message_id: "tmpl@example.com".into(),
        subject: "Away".into(),
        charset: Some("UTF-8".into()),
        ..Default::default()
    };
    let inbox = FakeFolder::new(INBOX, vec![original()]);
    let templates = FakeFolder::new(TEMPLATES, vec![template]);
    let mut folders = HashMap::new();
    folders.insert(INBOX.to_string(), inbox.clone());
    folders.insert(TEMPLATES.to_string(), templates);

    let retrieval = Arc::new(FakeRetrieval::default());
    let converter_log = Arc::new(Mutex::new(ConverterLog::default()));
    let draft_handle = SessionArena::new().insert(());
    let host = Arc::new(FakeHost::default());

    let service = ComposeService::new(ComposeContext {
        identities: Arc::new(accounts),
        prefs: prefs.clone(),
        services: Arc::new(FakeServices {
            retrieval: retrieval.clone(),
        }),
        converters: Arc::new(FakeConverters {
            log: converter_log.clone(),
            handle: draft_handle,
        }),
        store: Arc::new(FakeStore { folders }),
        host: host.clone(),
        sanitizer: Arc::new(Passthrough),
    });
    Harness {
        service,
        prefs,
        host,
        retrieval,
        converter_log,
        inbox,
        draft_handle,
    }
}

fn harness() -> Harness {
    harness_with_prefs(Preferences::new())
}

fn ignore_opened() -> OpenedCallback {
    Box::new(|_| {})
}

fn reply_request(kind: ReplyKind) -> ComposeRequest {
    ComposeRequest::Reply {
        kind,
        format: ComposeFormat::Default,
        identity: None,
        original: OriginalMessage::new("mailbox-message://me@host/Inbox#1"),
        ignore_quote: false,
    }
}

fn selection_window(text: &'static str, html: &'static str) -> MessageWindow {
    MessageWindow {
        surface: Some(SurfaceId(1)),
        charset_override: None,
        selection: Some(Arc::new(FakeSelection { text, html })),
    }
}

// ---- request resolution ----

#[test]
fn default_format_follows_identity_and_opposite_inverts() {
    let h = harness();
    let window = MessageWindow::default();
    h.service
        .open_compose_window(
            None,
            ComposeRequest::New {
                format: ComposeFormat::Default,
                identity: None,
                fields: ComposeFields::default(),
            },
            &window,
            ignore_opened(),
        )
        .unwrap();
    let mut plain = Identity::new("id3", "plain@example.com");
    plain.compose_html = false;
    h.service
        .open_compose_window(
            None,
            ComposeRequest::New {
                format: ComposeFormat::OppositeOfDefault,
                identity: Some(plain.clone()),
                fields: ComposeFields::default(),
            },
            &window,
            ignore_opened(),
        )
        .unwrap();

    let opened = h.host.take_opened();
    assert_eq!(opened.len(), 2);
    assert!(opened[0].0.compose_html);
    assert_eq!(opened[0].0.identity, Some(me()));
    assert!(opened[1].0.compose_html);
    assert_eq!(opened[1].0.identity, Some(plain));
}

#[test]
fn reply_all_quotes_multi_word_selection() {
    let h = harness();
    h.prefs.set(PREF_REPLY_QUOTING_SELECTION, PrefValue::Bool(true)).unwrap();
    let window = selection_window(
        "hello world",
        "<span class=\"moz-txt-citetags\">&gt; </span>hello world",
    );
    h.service
        .open_compose_window(None, reply_request(ReplyKind::ReplyAll), &window, ignore_opened())
        .unwrap();

    let opened = h.host.take_opened();
    let params = &opened[0].0;
    assert_eq!(params.compose_type, ComposeType::ReplyAll);
    assert_eq!(params.html_to_quote.as_deref(), Some("hello world"));
    assert_eq!(params.original_uri.as_deref(), Some("mailbox-message://me@host/Inbox#1"));
}

#[test]
fn quoting_gates_leave_reply_unquoted() {
    let h = harness();
    let window = selection_window("hello world", "hello world");
    h.service
        .open_compose_window(None, reply_request(ReplyKind::Reply), &window, ignore_opened())
        .unwrap();

    h.prefs.set(PREF_REPLY_QUOTING_SELECTION, PrefValue::Bool(true)).unwrap();
    let single_word = selection_window("hello", "hello");
    h.service
        .open_compose_window(None, reply_request(ReplyKind::Reply), &single_word, ignore_opened())
        .unwrap();

    let opened = h.host.take_opened();
    assert_eq!(opened.len(), 2);
    assert!(opened.iter().all(|(params, _)| params.html_to_quote.is_none()));
}

#[test]
fn news_post_splits_group_uri() {
    let h = harness();
    h.service
        .open_compose_window(
            None,
            ComposeRequest::NewsPost {
                format: ComposeFormat::PlainText,
                identity: None,
                group_uri: Some("news://news.example.com:119/comp.lang.rust".into()),
            },
            &MessageWindow::default(),
            ignore_opened(),
        )
        .unwrap();
    let opened = h.host.take_opened();
    assert_eq!(opened[0].0.fields.newspost_url, "news://news.example.com:119");
    assert_eq!(opened[0].0.fields.newsgroups, "comp.lang.rust");
    assert!(!opened[0].0.compose_html);
}

#[test]
fn mailto_uri_opens_window_with_fields() {
    let h = harness();
    h.service
        .open_compose_with_uri(None, "mailto:ann@example.org?subject=Hi%20there&body=x", Some(me()), ignore_opened())
        .unwrap();
    let opened = h.host.take_opened();
    let params = &opened[0].0;
    assert_eq!(params.compose_type, ComposeType::MailToUrl);
    assert_eq!(params.fields.to, "ann@example.org");
    assert_eq!(params.fields.subject, "Hi there");
    assert_eq!(params.identity, Some(me()));
}

#[tokio::test]
async fn open_compose_resolves_to_session_handle() {
    let h = harness();
    let future = h.service.open_compose(
        ComposeRequest::New {
            format: ComposeFormat::Html,
            identity: None,
            fields: ComposeFields::default(),
        },
        &MessageWindow::default(),
    );
    let (params, on_opened) = h.host.take_opened().pop().unwrap();
    let handle = h.service.init_compose(params, Some(SurfaceId(7))).unwrap();
    on_opened(Ok(handle));

    assert_eq!(future.await.unwrap(), handle);
    assert_eq!(h.service.lookup_session(SurfaceId(7)).unwrap(), handle);
    assert!(h.service.with_session(handle, |s| s.params().compose_html).unwrap());
}

// ---- draft conversion ----

#[test]
fn draft_from_file_is_rewritten_and_uses_charset_override() {
    let h = harness();
    h.retrieval.set_chunks(&[b"Subject: saved\r\n\r\n", b"body"]);
    let window = MessageWindow {
        surface: Some(SurfaceId(2)),
        charset_override: Some("ISO-8859-2".into()),
        selection: None,
    };
    let opened: Arc<Mutex<Option<Result<SessionHandle, String>>>> = Arc::new(Mutex::new(None));
    let slot = opened.clone();
    h.service
        .open_compose_window(
            None,
            ComposeRequest::StoredMessage {
                kind: StoredMessageKind::Draft,
                format: ComposeFormat::Default,
                identity: None,
                original: OriginalMessage::new("file:///home/me/saved.eml"),
            },
            &window,
            Box::new(move |r| *slot.lock().unwrap() = Some(r.map_err(|e| e.to_string()))),
        )
        .unwrap();

    let mailbox = "mailbox:///home/me/saved.eml?fetchCompleteMessage=true&number=0";
    let log = h.converter_log.lock().unwrap();
    assert_eq!(log.settings[0].original_uri, mailbox);
    assert_eq!(log.settings[0].identity, Some(me()));
    assert!(!log.settings[0].forward_inline_filter);
    assert_eq!(log.urls[0].spec, mailbox);
    assert_eq!(log.urls[0].charset_override.as_deref(), Some("ISO-8859-2"));
    assert_eq!(log.received, b"Subject: saved\r\n\r\nbody".to_vec());
    assert_eq!(log.finished, vec![Ok(())]);
    assert!(h.retrieval.url_lookups.lock().unwrap().is_empty());
    assert_eq!(
        h.retrieval.displayed.lock().unwrap()[0],
        (
            "file:///home/me/saved.eml?fetchCompleteMessage=true".to_string(),
            Some("ISO-8859-2".to_string())
        )
    );
    assert_eq!(opened.lock().unwrap().clone(), Some(Ok(h.draft_handle)));
}

#[test]
fn stored_message_url_comes_from_service() {
    let h = harness();
    h.service
        .open_compose_window(
            None,
            ComposeRequest::StoredMessage {
                kind: StoredMessageKind::Template,
                format: ComposeFormat::Default,
                identity: None,
                original: OriginalMessage::new("mailbox-message://me@host/Templates#9"),
            },
            &MessageWindow::default(),
            ignore_opened(),
        )
        .unwrap();
    let uri = "mailbox-message://me@host/Templates#9?fetchCompleteMessage=true";
    assert_eq!(h.retrieval.url_lookups.lock().unwrap().as_slice(), [uri.to_string()]);
    let log = h.converter_log.lock().unwrap();
    assert_eq!(log.urls[0].spec, uri);
    assert_eq!(log.settings[0].original_uri, "mailbox-message://me@host/Templates#9");
}

#[test]
fn unknown_service_fails_before_streaming() {
    let h = harness();
    let err = h
        .service
        .open_compose_window(
            None,
            ComposeRequest::StoredMessage {
                kind: StoredMessageKind::Draft,
                format: ComposeFormat::Default,
                identity: None,
                original: OriginalMessage::new("unknown:message/1"),
            },
            &MessageWindow::default(),
            ignore_opened(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ComposeError::Resolution {
            what: ResolutionTarget::Service,
            ..
        }
    ));
    assert!(h.retrieval.displayed.lock().unwrap().is_empty());
    assert!(h.converter_log.lock().unwrap().settings.is_empty());
}

#[test]
fn stream_failure_reaches_converter_and_caller() {
    let h = harness();
    *h.retrieval.failure.lock().unwrap() = Some(StoreError::new("connection reset"));
    let opened: Arc<Mutex<Option<Result<SessionHandle, String>>>> = Arc::new(Mutex::new(None));
    let slot = opened.clone();
    h.service
        .open_compose_window(
            None,
            ComposeRequest::StoredMessage {
                kind: StoredMessageKind::EditAsNew,
                format: ComposeFormat::Default,
                identity: None,
                original: OriginalMessage::new("mailbox-message://me@host/Inbox#1"),
            },
            &MessageWindow::default(),
            Box::new(move |r| *slot.lock().unwrap() = Some(r.map_err(|e| e.to_string()))),
        )
        .unwrap();
    assert_eq!(h.converter_log.lock().unwrap().finished.len(), 1);
    assert!(h.converter_log.lock().unwrap().finished[0].is_err());
    assert!(matches!(opened.lock().unwrap().clone(), Some(Err(_))));
}

// ---- forwarding ----

#[tokio::test]
async fn forward_defaults_to_attachment_and_marks_forwarded() {
    let h = harness();
    let future = h.service.forward(
        &original(),
        "boss@example.com",
        &ServerKey("server1".into()),
        ForwardMode::Default,
        &MessageWindow::default(),
    );
    let (params, _, on_sent) = h.host.take_sent().pop().unwrap();
    assert_eq!(params.compose_type, ComposeType::ForwardAsAttachment);
    assert_eq!(params.fields.to, "boss@example.com");
    assert_eq!(params.identity, Some(me()));
    assert_eq!(
        params.original_uri.as_deref(),
        Some("mailbox-message://me@host/Inbox#1?fetchCompleteMessage=true")
    );
    assert!(h.inbox.marks().is_empty());

    on_sent(Ok(()));
    future.await.unwrap();
    assert_eq!(
        h.inbox.marks(),
        vec![("orig@example.org".to_string(), DispositionState::Forwarded)]
    );
}

#[tokio::test]
async fn forward_mode_pref_selects_inline_conversion() {
    let h = harness();
    h.prefs.set(PREF_FORWARD_MESSAGE_MODE, PrefValue::Int(2)).unwrap();
    h.service
        .forward(
            &original(),
            "boss@example.com",
            &ServerKey("server1".into()),
            ForwardMode::Default,
            &MessageWindow::default(),
        )
        .await
        .unwrap();
    assert!(h.host.take_sent().is_empty());
    let log = h.converter_log.lock().unwrap();
    assert!(log.settings[0].forward_inline);
    assert!(log.settings[0].forward_inline_filter);
    assert_eq!(log.settings[0].forward_to.as_deref(), Some("boss@example.com"));
    assert_eq!(
        log.settings[0].original_uri,
        "mailbox-message://me@host/Inbox#1?fetchCompleteMessage=true"
    );
}

#[tokio::test]
async fn forward_send_failure_leaves_message_unmarked() {
    let h = harness();
    let future = h.service.forward(
        &original(),
        "boss@example.com",
        &ServerKey("server1".into()),
        ForwardMode::Attachment,
        &MessageWindow::default(),
    );
    let (_, _, on_sent) = h.host.take_sent().pop().unwrap();
    on_sent(Err(StoreError::new("smtp refused")));
    assert!(matches!(future.await, Err(ComposeError::Send(_))));
    assert!(h.inbox.marks().is_empty());
}

#[tokio::test]
async fn forward_requires_target_and_known_server() {
    let h = harness();
    let window = MessageWindow::default();
    let server = ServerKey("server1".into());
    let err = h
        .service
        .forward(&original(), "  ", &server, ForwardMode::Attachment, &window)
        .await
        .unwrap_err();
    assert!(matches!(err, ComposeError::NoRecipient));

    let err = h
        .service
        .forward(
            &original(),
            "boss@example.com",
            &ServerKey("elsewhere".into()),
            ForwardMode::Attachment,
            &window,
        )
        .await
        .unwrap_err();
    assert!(err.is_resolution());
    assert!(h.host.take_sent().is_empty());
}

// ---- template replies ----

#[tokio::test]
async fn template_reply_sends_template_body_and_marks_replied() {
    let h = harness();
    h.retrieval.set_chunks(&[
        b"Subject: Away\r\nContent-Type: text/plain; charset=UTF-8\r\n\r",
        b"\nI am ",
        b"away.",
    ]);
    let window = MessageWindow {
        surface: Some(SurfaceId(4)),
        ..Default::default()
    };
    let future = h
        .service
        .reply_with_template(&original(), TEMPLATE_REF, &ServerKey("server1".into()), &window);

    assert_eq!(
        h.retrieval.streamed.lock().unwrap().as_slice(),
        [("mailbox-message://me@host/Templates#9".to_string(), false)]
    );
    let (params, parent, on_sent) = h.host.take_sent().pop().unwrap();
    assert_eq!(parent, Some(SurfaceId(4)));
    assert_eq!(params.compose_type, ComposeType::ReplyWithTemplate);
    assert_eq!(params.fields.to, "Ann <ann@example.org>");
    assert_eq!(params.fields.subject, "Auto: Away (was: Question)");
    assert_eq!(params.fields.body, "I am away.");
    assert_eq!(params.fields.raw_header("Auto-Submitted"), Some("auto-replied"));
    assert_eq!(params.identity, Some(me()));
    assert!(h.inbox.marks().is_empty());

    on_sent(Ok(()));
    assert_eq!(future.await.unwrap(), ReplyStatus::Sent);
    assert_eq!(
        h.inbox.marks(),
        vec![("orig@example.org".to_string(), DispositionState::Replied)]
    );
}

#[tokio::test]
async fn template_reply_suppressed_when_not_addressed_to_us() {
    let h = harness();
    let mut header = original();
    header.recipients = "list@lists.example.org".into();
    let status = h
        .service
        .reply_with_template(&header, TEMPLATE_REF, &ServerKey("server1".into()), &MessageWindow::default())
        .await
        .unwrap();
    assert_eq!(status, ReplyStatus::Suppressed);
    assert!(h.retrieval.streamed.lock().unwrap().is_empty());
    assert!(h.host.take_sent().is_empty());
}

#[tokio::test]
async fn template_reply_stream_failure_sends_nothing() {
    let h = harness();
    h.retrieval.set_chunks(&[b"Subject: Away\r\n\r\nI am"]);
    *h.retrieval.failure.lock().unwrap() = Some(StoreError::new("truncated"));
    let err = h
        .service
        .reply_with_template(&original(), TEMPLATE_REF, &ServerKey("server1".into()), &MessageWindow::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ComposeError::Stream(_)));
    assert!(h.host.take_sent().is_empty());
    assert!(h.inbox.marks().is_empty());
}

#[tokio::test]
async fn template_reply_resolution_failures_abort_before_streaming() {
    let h = harness();
    let server = ServerKey("server1".into());
    let window = MessageWindow::default();

    let missing = "mailbox://me@host/Templates?messageId=nope@example.com&subject=Away";
    let err = h
        .service
        .reply_with_template(&original(), missing, &server, &window)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ComposeError::Resolution {
            what: ResolutionTarget::MessageId,
            ..
        }
    ));

    let no_folder = "mailbox://me@host/Gone?messageId=tmpl@example.com&subject=Away";
    let err = h
        .service
        .reply_with_template(&original(), no_folder, &server, &window)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ComposeError::Resolution {
            what: ResolutionTarget::Folder,
            ..
        }
    ));

    let mut anonymous = original();
    anonymous.author.clear();
    let err = h
        .service
        .reply_with_template(&anonymous, TEMPLATE_REF, &server, &window)
        .await
        .unwrap_err();
    assert!(matches!(err, ComposeError::NoRecipient));

    assert!(h.retrieval.streamed.lock().unwrap().is_empty());
    assert!(h.host.take_sent().is_empty());
}

// ---- sessions ----

#[test]
fn closed_session_is_not_found_through_registry() {
    let h = harness();
    let surface = SurfaceId(3);
    let handle = h
        .service
        .init_compose(ResolvedParams::new(ComposeType::New, ComposeFormat::Html), Some(surface))
        .unwrap();
    assert_eq!(h.service.lookup_session(surface).unwrap(), handle);

    let closed = h.service.close_session(handle).unwrap().unwrap();
    assert_eq!(closed.surface(), Some(surface));
    assert!(matches!(h.service.lookup_session(surface), Err(ComposeError::NotFound)));

    h.service.register_session(surface, handle).unwrap();
    assert!(matches!(h.service.lookup_session(surface), Err(ComposeError::NotFound)));

    let replacement = h
        .service
        .init_compose(ResolvedParams::new(ComposeType::New, ComposeFormat::Html), None)
        .unwrap();
    assert_ne!(replacement, handle);
    h.service.register_session(surface, replacement).unwrap();
    assert_eq!(h.service.lookup_session(surface).unwrap(), replacement);
    h.service.unregister_session(surface).unwrap();
    assert!(matches!(h.service.lookup_session(surface), Err(ComposeError::NotFound)));
    assert_eq!(h.service.session_count(), 1);
}

// ---- startup and command line ----

#[test]
fn init_merges_html_domains_and_removes_temp_files() {
    let mut defaults = HashMap::new();
    defaults.insert(PREF_GLOBAL_HTML_DOMAINS_VERSION.to_string(), PrefValue::Int(1));
    defaults.insert(PREF_GLOBAL_HTML_DOMAINS.to_string(), PrefValue::Str("isp.example".into()));
    let h = harness_with_prefs(Preferences::with_defaults(defaults));
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("nsmail-1.tmp"), b"x").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

    h.service.init_in(dir.path()).unwrap();

    assert_eq!(h.prefs.string_pref(PREF_HTML_DOMAINS).as_deref(), Some("isp.example"));
    assert_eq!(h.prefs.int_pref(PREF_GLOBAL_HTML_DOMAINS_VERSION), Some(2));
    assert!(!dir.path().join("nsmail-1.tmp").exists());
    assert!(dir.path().join("notes.txt").exists());
}

#[test]
fn command_line_compose_opens_window() {
    let h = harness();
    let args: Vec<String> = ["app", "-compose", "to=ann@example.org,subject=Hi", "there"]
        .iter()
        .map(|a| a.to_string())
        .collect();
    let command = h.service.handle_command_line(&args).unwrap().unwrap();
    assert_eq!((command.start, command.end), (1, 3));
    assert_eq!(
        h.host.arguments.lock().unwrap().as_slice(),
        ["to=ann@example.org,subject=Hi there".to_string()]
    );

    let other: Vec<String> = vec!["app".into(), "-url".into(), "https://example.com".into()];
    assert_eq!(h.service.handle_command_line(&other).unwrap(), None);
    assert!(h.service.help_info().contains("-compose"));
}
