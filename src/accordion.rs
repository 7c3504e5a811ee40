//! FAQ accordion.
//!
//! Each `.faq-item` holds a `.faq-question` control and a `.faq-answer`
//! region. A panel is expanded when its item carries `active`; the
//! question's `aria-expanded` and the answer's `hidden` attribute always
//! agree with that class.
//!
//! With `accordion.single_open` (the default), expanding a panel collapses
//! every other panel in the same `.faq-list`, or on the page when the item is
//! not inside a list.

use crate::context::{Context, UiError, report};
use crate::dom::{Dom, DomError, NodeId};
use crate::events::{EventKind, Teardown};
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Panel {
    item: NodeId,
    question: NodeId,
    answer: Option<NodeId>,
    group: Option<NodeId>,
}

struct Accordion {
    dom: Rc<dyn Dom>,
    panels: Vec<Panel>,
    single_open: bool,
}

impl Accordion {
    fn is_expanded(&self, i: usize) -> bool {
        self.dom.has_class(self.panels[i].item, "active")
    }

    fn set(&self, i: usize, expanded: bool) -> Result<(), DomError> {
        let panel = &self.panels[i];
        self.dom.toggle_class(panel.item, "active", expanded)?;
        self.dom.set_attr(
            panel.question,
            "aria-expanded",
            if expanded { "true" } else { "false" },
        )?;
        if let Some(answer) = panel.answer {
            if expanded {
                self.dom.remove_attr(answer, "hidden")?;
                let height = self.dom.metrics(answer).scroll_height;
                self.dom.set_style(answer, "max-height", &format!("{height}px"))?;
            } else {
                self.dom.set_attr(answer, "hidden", "")?;
                self.dom.set_style(answer, "max-height", "0")?;
            }
        }
        Ok(())
    }

    fn toggle(&self, i: usize) -> Result<(), DomError> {
        if self.is_expanded(i) {
            debug!(panel = i, "faq collapse");
            return self.set(i, false);
        }
        if self.single_open {
            let group = self.panels[i].group;
            for j in 0..self.panels.len() {
                if j != i && self.panels[j].group == group && self.is_expanded(j) {
                    self.set(j, false)?;
                }
            }
        }
        debug!(panel = i, "faq expand");
        self.set(i, true)
    }
}

pub fn init_accordion(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    let dom = &ctx.dom;
    let mut panels = Vec::new();
    for item in dom.query_all(None, ".faq-item")? {
        let Some(question) = dom.query_in(item, ".faq-question")? else {
            continue;
        };
        let answer = dom.query_in(item, ".faq-answer")?;
        if let Some(answer) = answer {
            dom.set_style(answer, "overflow", "hidden")?;
        }
        if dom.attr(question, "tabindex").is_none() {
            dom.set_attr(question, "tabindex", "0")?;
        }
        let group = dom.closest(item, ".faq-list")?;
        panels.push(Panel {
            item,
            question,
            answer,
            group,
        });
    }
    if panels.is_empty() {
        return Ok(teardown);
    }

    let accordion = Rc::new(Accordion {
        dom: Rc::clone(dom),
        panels,
        single_open: ctx.config.accordion.single_open,
    });
    for i in 0..accordion.panels.len() {
        accordion.set(i, false)?;
        let question = accordion.panels[i].question;

        let a = Rc::clone(&accordion);
        teardown.push(ctx.on(question, EventKind::Click, move |_| {
            report("accordion", a.toggle(i));
        }));

        let a = Rc::clone(&accordion);
        teardown.push(ctx.on(question, EventKind::KeyDown, move |event| {
            if event.key.as_ref().is_some_and(|k| k.activates()) {
                event.prevent_default();
                report("accordion", a.toggle(i));
            }
        }));
    }
    Ok(teardown)
}
