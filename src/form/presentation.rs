use tracing::debug;

use super::controller::{FieldKey, FormController, FormResult, read_lock, write_lock};
use super::surface::{FormSurface, GroupState};

pub const FOCUS_OFFSET: f64 = 20.0;

impl<S> FormController<S>
where
    S: FormSurface,
{
    pub(super) fn show_errors(&self, key: &FieldKey) -> FormResult<()> {
        let errors = read_lock(&self.state, "reading errors to show")?
            .errors(key)
            .to_vec();
        if errors.is_empty() {
            return Ok(());
        }

        if let Some(current) = self.surface.error_region(key) {
            write_lock(&self.state, "remembering error region content")?
                .original_content
                .entry(key.clone())
                .or_insert(current);
            self.surface
                .set_error_region(key, &render_error_list(&errors, self.options.html));
        }
        self.surface.set_group_state(key, GroupState::Error);
        if self.surface.has_feedback(key) {
            self.surface
                .set_feedback_icon(key, Some(&self.options.feedback.error));
        }
        write_lock(&self.state, "marking errors shown")?
            .ensure_meta(key)
            .showing = true;
        Ok(())
    }

    pub(super) fn clear_errors(&self, key: &FieldKey) -> FormResult<()> {
        let original = read_lock(&self.state, "reading original error region")?
            .original_content
            .get(key)
            .cloned();
        if let Some(original) = original {
            self.surface.set_error_region(key, &original);
        }

        let filled = self
            .surface
            .value(key)
            .is_some_and(|value| value.is_non_empty());
        self.surface.set_group_state(
            key,
            if filled {
                GroupState::Success
            } else {
                GroupState::Neutral
            },
        );
        if self.surface.has_feedback(key) {
            let icon = filled.then_some(self.options.feedback.success.as_str());
            self.surface.set_feedback_icon(key, icon);
        }
        write_lock(&self.state, "marking errors cleared")?
            .ensure_meta(key)
            .showing = false;
        Ok(())
    }

    pub(super) fn toggle_submit(&self) -> FormResult<()> {
        if !self.options.disable {
            return Ok(());
        }
        let (fields, has_errors) = {
            let state = read_lock(&self.state, "computing submit state")?;
            let has_errors = state
                .field_meta
                .values()
                .any(|meta| !meta.errors.is_empty());
            (state.fields.clone(), has_errors)
        };
        self.surface
            .set_submit_disabled(has_errors || self.any_required_empty(&fields));
        Ok(())
    }

    pub(super) fn focus_error(&self) -> FormResult<Option<FieldKey>> {
        if !self.options.focus {
            return Ok(None);
        }
        let first = {
            let state = read_lock(&self.state, "finding first errored field")?;
            state
                .fields
                .iter()
                .find(|key| !state.errors(key).is_empty())
                .cloned()
        };
        let Some(key) = first else {
            return Ok(None);
        };
        let top = self.surface.offset_top(&key) - FOCUS_OFFSET;
        debug!(field = %key, top, "focusing first errored field");
        self.surface.scroll_to(top);
        self.surface.focus(&key);
        Ok(Some(key))
    }
}

pub(super) fn render_error_list(errors: &[String], html: bool) -> String {
    let mut markup = String::from(r#"<ul class="list-unstyled">"#);
    for error in errors {
        markup.push_str("<li>");
        if html {
            markup.push_str(error);
        } else {
            escape_into(&mut markup, error);
        }
        markup.push_str("</li>");
    }
    markup.push_str("</ul>");
    markup
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}
