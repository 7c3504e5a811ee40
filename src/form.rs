//! Contact form validation and simulated submission.
//!
//! Fields are checked on blur, re-checked on every input while they show an
//! error, and all checked together on submit. A field never carries more
//! than one `.field-error` message. Submission never leaves the page: a
//! valid form enters a "Sending..." state, and after a fixed delay it is
//! reset and a success notice is shown for a while.

use crate::context::{Context, UiError, report};
use crate::dom::{Dom, DomError, NodeId};
use crate::events::{EventKind, Subscription, Teardown};
use crate::schedule::{Millis, Scheduler, TimerId};
use regex::Regex;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info};

pub const FORM_SELECTOR: &str = "form.contact-form, form[data-validate]";
const FIELD_SELECTOR: &str = "input, textarea, select";
const SENDING_TEXT: &str = "Sending...";
const FALLBACK_NOTICE: &str =
    "Thank you! Your message has been sent. We will contact you shortly.";
/// Opacity transition of the success notice before it is hidden.
const NOTICE_FADE_MS: Millis = 400;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));
static PHONE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-().]").expect("separator pattern is valid"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?\d{10,15}$").expect("phone pattern is valid"));

/// A rule a field value failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("{0} is required.")]
    Required(String),
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Please enter a valid phone number.")]
    InvalidPhone,
    #[error("Please enter your full name.")]
    NameTooShort,
    #[error("Please enter a message (at least 10 characters).")]
    MessageTooShort,
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value.trim())
}

/// At least ten digits once spaces, dashes, dots and parentheses are
/// removed, optionally behind a `+` country prefix.
pub fn is_valid_phone(value: &str) -> bool {
    PHONE.is_match(&PHONE_SEPARATORS.replace_all(value.trim(), ""))
}

/// What the validator needs to know about one control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRules {
    pub tag: String,
    /// Lower-cased `type` attribute, `text` when absent.
    pub input_type: String,
    pub name: String,
    pub required: bool,
    /// Human name used in the "required" message.
    pub label: String,
}

impl FieldRules {
    pub fn read(dom: &dyn Dom, field: NodeId) -> Result<Self, DomError> {
        let tag = dom.tag_name(field).unwrap_or_default();
        let input_type = dom
            .attr(field, "type")
            .map(|t| t.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "text".to_string());
        let name = dom.attr(field, "name").unwrap_or_default();
        Ok(Self {
            label: field_label(dom, field, &name)?,
            required: dom.attr(field, "required").is_some(),
            tag,
            input_type,
            name,
        })
    }

    pub fn check(&self, value: &str) -> Result<(), FieldError> {
        let value = value.trim();
        if value.is_empty() {
            if self.required {
                return Err(FieldError::Required(self.label.clone()));
            }
            return Ok(());
        }
        if self.input_type == "email" && !is_valid_email(value) {
            return Err(FieldError::InvalidEmail);
        }
        if self.input_type == "tel" && !is_valid_phone(value) {
            return Err(FieldError::InvalidPhone);
        }
        let length = value.chars().count();
        if self.tag == "input" && matches!(self.name.as_str(), "name" | "full_name") && length < 2 {
            return Err(FieldError::NameTooShort);
        }
        if self.tag == "textarea" && self.name == "message" && length < 10 {
            return Err(FieldError::MessageTooShort);
        }
        Ok(())
    }
}

/// `label[for=id]` text, then the placeholder, then the name.
fn field_label(dom: &dyn Dom, field: NodeId, name: &str) -> Result<String, DomError> {
    if let Some(id) = dom.attr(field, "id").filter(|id| !id.is_empty()) {
        for label in dom.query_all(None, "label[for]")? {
            if dom.attr(label, "for").as_deref() == Some(id.as_str()) {
                let text = dom.text(label);
                let text = text.trim().trim_end_matches(['*', ':', ' ']).trim();
                if !text.is_empty() {
                    return Ok(text.to_string());
                }
            }
        }
    }
    if let Some(placeholder) = dom.attr(field, "placeholder") {
        let placeholder = placeholder.trim();
        if !placeholder.is_empty() {
            return Ok(placeholder.to_string());
        }
    }
    Ok(if name.is_empty() { "This field".to_string() } else { name.to_string() })
}

struct FormController {
    dom: Rc<dyn Dom>,
    scheduler: Rc<dyn Scheduler>,
    form: NodeId,
    fields: Vec<(NodeId, FieldRules)>,
    submit: Option<NodeId>,
    notice: Option<NodeId>,
    submit_delay: Millis,
    notice_ms: Millis,
    /// Field → its `.field-error` node.
    errors: RefCell<HashMap<NodeId, NodeId>>,
    sending: Cell<bool>,
    /// Timeouts that have not fired yet.
    timers: Rc<RefCell<Vec<TimerId>>>,
}

impl FormController {
    fn show_error(&self, field: NodeId, error: &FieldError) -> Result<(), DomError> {
        let existing = self.errors.borrow().get(&field).copied();
        let message = match existing {
            Some(node) => node,
            None => {
                let node = self.dom.create_element("span");
                self.dom.set_attr(node, "class", "field-error")?;
                self.dom.set_attr(node, "role", "alert")?;
                self.dom.insert_after(field, node)?;
                self.errors.borrow_mut().insert(field, node);
                node
            }
        };
        self.dom.set_text(message, &error.to_string())?;
        self.dom.add_class(field, "input-error")?;
        self.dom.set_attr(field, "aria-invalid", "true")
    }

    fn clear_error(&self, field: NodeId) -> Result<(), DomError> {
        let message = self.errors.borrow_mut().remove(&field);
        if let Some(node) = message {
            self.dom.remove(node)?;
        }
        self.dom.remove_class(field, "input-error")?;
        self.dom.remove_attr(field, "aria-invalid")
    }

    fn is_invalid(&self, field: NodeId) -> bool {
        self.errors.borrow().contains_key(&field)
    }

    /// Check one field and update its decoration. Returns whether it passed.
    fn validate(&self, index: usize) -> Result<bool, DomError> {
        let (field, rules) = &self.fields[index];
        match rules.check(&self.dom.value(*field)) {
            Ok(()) => {
                self.clear_error(*field)?;
                Ok(true)
            }
            Err(error) => {
                debug!(field = %rules.name, %error, "field invalid");
                self.show_error(*field, &error)?;
                Ok(false)
            }
        }
    }

    fn submit(self: &Rc<Self>) -> Result<(), DomError> {
        if self.sending.get() {
            return Ok(());
        }
        let mut first_invalid = None;
        for index in 0..self.fields.len() {
            if !self.validate(index)? && first_invalid.is_none() {
                first_invalid = Some(self.fields[index].0);
            }
        }
        if let Some(field) = first_invalid {
            return self.dom.focus(field);
        }
        self.begin_send()
    }

    fn button_text(&self, button: NodeId) -> String {
        match self.dom.tag_name(button).as_deref() {
            Some("input") => self.dom.attr(button, "value").unwrap_or_default(),
            _ => self.dom.text(button),
        }
    }

    fn set_button_text(&self, button: NodeId, text: &str) -> Result<(), DomError> {
        match self.dom.tag_name(button).as_deref() {
            Some("input") => self.dom.set_attr(button, "value", text),
            _ => self.dom.set_text(button, text),
        }
    }

    fn begin_send(self: &Rc<Self>) -> Result<(), DomError> {
        self.sending.set(true);
        let original = match self.submit {
            Some(button) => {
                let text = self.button_text(button);
                self.dom.set_disabled(button, true)?;
                self.set_button_text(button, SENDING_TEXT)?;
                Some((button, text))
            }
            None => None,
        };
        debug!(form = %self.form, "sending");
        let this = Rc::clone(self);
        self.after(self.submit_delay, move || {
            report("form", this.complete(original));
        });
        Ok(())
    }

    fn complete(self: &Rc<Self>, original: Option<(NodeId, String)>) -> Result<(), DomError> {
        if let Some((button, text)) = original {
            self.dom.set_disabled(button, false)?;
            self.set_button_text(button, &text)?;
        }
        self.dom.reset_form(self.form)?;
        for (field, _) in &self.fields {
            self.clear_error(*field)?;
        }
        self.sending.set(false);
        info!(form = %self.form, "contact form submitted");
        self.show_notice()
    }

    fn show_notice(self: &Rc<Self>) -> Result<(), DomError> {
        let dom = Rc::clone(&self.dom);
        match self.notice {
            Some(notice) => {
                dom.remove_attr(notice, "hidden")?;
                dom.set_style(notice, "display", "block")?;
                dom.set_style(notice, "opacity", "1")?;
                dom.scroll_into_view(notice)?;
                let this = Rc::clone(self);
                self.after(self.notice_ms, move || {
                    report("form", dom.set_style(notice, "opacity", "0"));
                    let dom = Rc::clone(&dom);
                    this.after(NOTICE_FADE_MS, move || {
                        report("form", dom.set_style(notice, "display", "none"));
                        report("form", dom.set_attr(notice, "hidden", ""));
                    });
                });
            }
            None => {
                let fallback = dom.create_element("div");
                dom.set_attr(fallback, "class", "form-success form-success-fallback")?;
                dom.set_attr(fallback, "role", "status")?;
                dom.set_text(fallback, FALLBACK_NOTICE)?;
                dom.insert_after(self.form, fallback)?;
                dom.scroll_into_view(fallback)?;
                self.after(self.notice_ms, move || report("form", dom.remove(fallback)));
            }
        }
        Ok(())
    }

    fn after(&self, delay: Millis, f: impl FnOnce() + 'static) {
        let timers = Rc::clone(&self.timers);
        let slot: Rc<Cell<Option<TimerId>>> = Rc::default();
        let fired = Rc::clone(&slot);
        let id = self.scheduler.set_timeout(
            delay,
            Box::new(move || {
                if let Some(id) = fired.get() {
                    timers.borrow_mut().retain(|pending| *pending != id);
                }
                f();
            }),
        );
        slot.set(Some(id));
        self.timers.borrow_mut().push(id);
    }
}

fn is_validated_control(dom: &dyn Dom, field: NodeId) -> bool {
    let kind = dom.attr(field, "type").unwrap_or_default().to_ascii_lowercase();
    !matches!(kind.as_str(), "submit" | "button" | "reset" | "hidden")
}

fn notice_for(dom: &dyn Dom, form: NodeId) -> Result<Option<NodeId>, DomError> {
    if let Some(notice) = dom.query_in(form, ".form-success")? {
        return Ok(Some(notice));
    }
    match dom.parent(form) {
        Some(parent) => dom.query_in(parent, ".form-success"),
        None => Ok(None),
    }
}

pub fn init_forms(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    for form in ctx.dom.query_all(None, FORM_SELECTOR)? {
        teardown.extend(init_form(ctx, form)?);
    }
    Ok(teardown)
}

fn init_form(ctx: &Context, form: NodeId) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    let dom = &ctx.dom;
    let mut fields = Vec::new();
    for field in dom.query_all(Some(form), FIELD_SELECTOR)? {
        if is_validated_control(&**dom, field) {
            fields.push((field, FieldRules::read(&**dom, field)?));
        }
    }
    let submit = match dom.query_in(form, "button[type=submit], input[type=submit]")? {
        Some(button) => Some(button),
        None => dom.query_in(form, "button")?,
    };
    let controller = Rc::new(FormController {
        dom: Rc::clone(dom),
        scheduler: Rc::clone(&ctx.scheduler),
        form,
        fields,
        submit,
        notice: notice_for(&**dom, form)?,
        submit_delay: ctx.behavior().form_submit_delay_ms,
        notice_ms: ctx.behavior().success_notice_ms,
        errors: RefCell::default(),
        sending: Cell::new(false),
        timers: Rc::default(),
    });
    dom.set_attr(form, "novalidate", "")?;

    for index in 0..controller.fields.len() {
        let field = controller.fields[index].0;
        let c = Rc::clone(&controller);
        teardown.push(ctx.on(field, EventKind::Blur, move |_| {
            report("form", c.validate(index).map(drop));
        }));
        let c = Rc::clone(&controller);
        teardown.push(ctx.on(field, EventKind::Input, move |_| {
            if c.is_invalid(field) {
                report("form", c.validate(index).map(drop));
            }
        }));
    }

    let c = Rc::clone(&controller);
    teardown.push(ctx.on(form, EventKind::Submit, move |event| {
        event.prevent_default();
        report("form", c.submit());
    }));
    let scheduler = Rc::clone(&ctx.scheduler);
    let timers = Rc::clone(&controller.timers);
    teardown.push(Subscription::new(move || {
        for id in timers.take() {
            scheduler.cancel(id);
        }
    }));
    Ok(teardown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use maud::{Markup, html};

    fn rules(tag: &str, input_type: &str, name: &str, required: bool) -> FieldRules {
        FieldRules {
            tag: tag.to_string(),
            input_type: input_type.to_string(),
            name: name.to_string(),
            required,
            label: "Field".to_string(),
        }
    }

    fn contact_form(with_notice: bool) -> Markup {
        html! {
            form.contact-form action="/thanks" {
                label for="name" { "Full Name *" }
                input #name type="text" name="name" required;
                label for="email" { "Email:" }
                input #email type="email" name="email" required;
                input #phone type="tel" name="phone" placeholder="Phone Number";
                select name="service" {
                    option value="" { "Choose a service" }
                    option value="termite-control" { "Termite Control" }
                }
                textarea #message name="message" required {}
                input type="hidden" name="source" value="site";
                button type="submit" { "Send Message" }
            }
            @if with_notice {
                div.form-success hidden { "Thanks! We'll be in touch." }
            }
        }
    }

    fn fill_valid(sim: &crate::sim::Simulation) {
        sim.type_text(find(sim, "#name"), "Marie Broussard");
        sim.type_text(find(sim, "#email"), "marie@example.com");
        sim.type_text(find(sim, "#phone"), "(337) 555-0199");
        sim.type_text(find(sim, "#message"), "Termites in the back porch, please call.");
    }

    // =========================================================================
    // Rules
    // =========================================================================

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email(" marie@example.com "));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
    }

    #[test]
    fn phone_pattern() {
        assert!(is_valid_phone("(337) 555-0199"));
        assert!(is_valid_phone("337.555.0199"));
        assert!(is_valid_phone("+1 337 555 0199"));
        assert!(!is_valid_phone("555-0199"));
        assert!(!is_valid_phone("call me maybe"));
        assert!(!is_valid_phone("++13375550199"));
    }

    #[test]
    fn required_and_optional_fields() {
        let required = rules("input", "text", "city", true);
        assert_eq!(required.check("  "), Err(FieldError::Required("Field".into())));
        assert_eq!(required.check("Lafayette"), Ok(()));
        let optional = rules("input", "tel", "phone", false);
        assert_eq!(optional.check(""), Ok(()));
        assert_eq!(optional.check("123"), Err(FieldError::InvalidPhone));
    }

    #[test]
    fn length_rules() {
        let name = rules("input", "text", "full_name", true);
        assert_eq!(name.check("J"), Err(FieldError::NameTooShort));
        assert_eq!(name.check("Jo"), Ok(()));
        let message = rules("textarea", "text", "message", true);
        assert_eq!(message.check("hi"), Err(FieldError::MessageTooShort));
        assert_eq!(message.check("hello there, I need pest control"), Ok(()));
        // Only a textarea counts as the message body.
        assert_eq!(rules("input", "text", "message", true).check("hi"), Ok(()));
    }

    #[test]
    fn label_preference_order() {
        let sim = sim(html! {
            form.contact-form {
                label for="a" { "Your Name *" }
                input #a name="name" placeholder="Jane";
                input #b name="zip" placeholder="ZIP code";
                input name="street";
            }
        });
        let inputs = sim.find_all("input");
        let labels: Vec<String> = inputs
            .iter()
            .map(|i| FieldRules::read(&*sim.doc, *i).unwrap().label)
            .collect();
        assert_eq!(labels, ["Your Name", "ZIP code", "street"]);
    }

    // =========================================================================
    // Field decoration
    // =========================================================================

    #[test]
    fn blur_shows_single_error_and_input_clears_it() {
        let sim = sim(contact_form(true));
        let _t = init_forms(&sim.ctx).unwrap();
        let email = find(&sim, "#email");
        sim.type_text(email, "not-an-email");
        sim.blur(email);
        sim.blur(email);
        let errors = find_n(&sim, ".field-error", 1);
        assert_eq!(text(&sim, errors[0]), "Please enter a valid email address.");
        assert!(has_class(&sim, email, "input-error"));

        sim.type_text(email, "a@b.co");
        find_n(&sim, ".field-error", 0);
        assert!(!has_class(&sim, email, "input-error"));
        assert_eq!(attr(&sim, email, "aria-invalid"), None);
    }

    #[test]
    fn error_message_changes_in_place() {
        let sim = sim(contact_form(true));
        let _t = init_forms(&sim.ctx).unwrap();
        let name = find(&sim, "#name");
        sim.blur(name);
        assert_eq!(text(&sim, find(&sim, ".field-error")), "Full Name is required.");
        sim.type_text(name, "J");
        let errors = find_n(&sim, ".field-error", 1);
        assert_eq!(text(&sim, errors[0]), "Please enter your full name.");
    }

    #[test]
    fn input_does_not_validate_untouched_fields() {
        let sim = sim(contact_form(true));
        let _t = init_forms(&sim.ctx).unwrap();
        sim.type_text(find(&sim, "#email"), "partial@");
        find_n(&sim, ".field-error", 0);
    }

    // =========================================================================
    // Submission
    // =========================================================================

    #[test]
    fn invalid_submit_is_blocked_and_focuses_first_error() {
        let sim = sim(contact_form(true));
        let _t = init_forms(&sim.ctx).unwrap();
        sim.type_text(find(&sim, "#name"), "Marie");
        sim.type_text(find(&sim, "#email"), "not-an-email");
        sim.type_text(find(&sim, "#message"), "hi");
        let event = sim.submit(find(&sim, "form"));
        assert!(event.default_prevented());
        find_n(&sim, ".field-error", 2);
        use crate::dom::Dom;
        assert_eq!(sim.doc.focused(), Some(find(&sim, "#email")));
        assert_eq!(text(&sim, find(&sim, "button")), "Send Message");
        sim.advance(10_000);
        assert_eq!(sim.doc.value(find(&sim, "#email")), "not-an-email");
    }

    #[test]
    fn valid_submit_sends_resets_and_shows_notice() {
        use crate::dom::Dom;
        let sim = sim(contact_form(true));
        let _t = init_forms(&sim.ctx).unwrap();
        fill_valid(&sim);
        let button = find(&sim, "button");
        let notice = find(&sim, ".form-success");

        assert!(sim.submit(find(&sim, "form")).default_prevented());
        assert!(sim.doc.is_disabled(button));
        assert_eq!(text(&sim, button), "Sending...");
        // A second submit while sending is ignored.
        sim.submit(find(&sim, "form"));

        sim.advance(799);
        assert!(sim.doc.is_disabled(button));
        sim.advance(1);
        assert!(!sim.doc.is_disabled(button));
        assert_eq!(text(&sim, button), "Send Message");
        assert_eq!(sim.doc.value(find(&sim, "#email")), "");
        assert_eq!(sim.doc.value(find(&sim, "#message")), "");
        assert_eq!(attr(&sim, notice, "hidden"), None);
        assert_eq!(sim.doc.style(notice, "display").as_deref(), Some("block"));
        assert_eq!(sim.doc.scrolled_into_view(), vec![notice]);

        sim.advance(5000);
        assert_eq!(sim.doc.style(notice, "opacity").as_deref(), Some("0"));
        sim.advance(NOTICE_FADE_MS);
        assert_eq!(sim.doc.style(notice, "display").as_deref(), Some("none"));
        assert!(attr(&sim, notice, "hidden").is_some());
        assert_eq!(sim.clock.pending_count(), 0);
    }

    #[test]
    fn fallback_notice_is_created_and_removed() {
        let sim = sim(contact_form(false));
        let _t = init_forms(&sim.ctx).unwrap();
        fill_valid(&sim);
        sim.submit(find(&sim, "form"));
        sim.advance(800);
        let notice = find(&sim, ".form-success-fallback");
        assert!(text(&sim, notice).starts_with("Thank you!"));
        sim.advance(5000);
        assert!(sim.find(".form-success-fallback").is_none());
    }

    #[test]
    fn teardown_cancels_pending_completion() {
        use crate::dom::Dom;
        let sim = sim(contact_form(true));
        let teardown = init_forms(&sim.ctx).unwrap();
        fill_valid(&sim);
        sim.submit(find(&sim, "form"));
        teardown.dispose();
        sim.advance(10_000);
        assert!(sim.doc.is_disabled(find(&sim, "button")));
        assert_eq!(sim.clock.pending_count(), 0);
    }

    struct CountingScheduler {
        inner: Rc<dyn Scheduler>,
        cancels: Cell<usize>,
    }

    impl Scheduler for CountingScheduler {
        fn now(&self) -> Millis {
            self.inner.now()
        }
        fn set_timeout(&self, delay: Millis, callback: Box<dyn FnOnce()>) -> TimerId {
            self.inner.set_timeout(delay, callback)
        }
        fn set_interval(&self, period: Millis, callback: Rc<dyn Fn()>) -> TimerId {
            self.inner.set_interval(period, callback)
        }
        fn request_frame(&self, callback: Box<dyn FnOnce(Millis)>) -> TimerId {
            self.inner.request_frame(callback)
        }
        fn cancel(&self, id: TimerId) {
            self.cancels.set(self.cancels.get() + 1);
            self.inner.cancel(id);
        }
    }

    #[test]
    fn fired_timers_are_released() {
        let mut sim = sim(contact_form(true));
        let counting = Rc::new(CountingScheduler {
            inner: Rc::clone(&sim.ctx.scheduler),
            cancels: Cell::new(0),
        });
        sim.ctx.scheduler = Rc::clone(&counting) as Rc<dyn Scheduler>;
        let teardown = init_forms(&sim.ctx).unwrap();
        for _ in 0..3 {
            fill_valid(&sim);
            sim.submit(find(&sim, "form"));
            sim.advance(10_000);
        }
        assert_eq!(sim.clock.pending_count(), 0);
        teardown.dispose();
        assert_eq!(counting.cancels.get(), 0);
    }

    #[test]
    fn data_validate_forms_are_included() {
        let sim = sim(html! {
            form data-validate="" {
                input type="email" name="email" required;
                button { "Go" }
            }
        });
        let _t = init_forms(&sim.ctx).unwrap();
        sim.submit(find(&sim, "form"));
        find_n(&sim, ".field-error", 1);
    }

    #[test]
    fn no_forms_is_noop() {
        let sim = sim(html! { form.search { input name="q"; } });
        assert!(init_forms(&sim.ctx).unwrap().is_empty());
    }
}
