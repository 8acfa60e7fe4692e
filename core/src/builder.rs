//! The request form as an explicit state machine.
//!
//! Every user edit is a method call; there is no implicit re-render. The form
//! starts as an empty GET with one blank header row. `initialize` is the only
//! way a load token gets into the form.

use crate::history::LoadSlot;
use crate::http::HttpMethod;
use crate::types::{HeaderPair, RequestDescriptor};
use crate::validate;

#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    form: RequestDescriptor,
    loading: bool,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh builder, populated from `slot` if a token is pending.
    pub fn from_slot(slot: &LoadSlot) -> Self {
        let mut builder = Self::new();
        builder.initialize(slot);
        builder
    }

    /// Reset the form, then consume a pending load token into it.
    pub fn initialize(&mut self, slot: &LoadSlot) {
        self.form = RequestDescriptor::default();
        self.loading = false;
        if let Some(entry) = slot.take() {
            tracing::debug!(url = %entry.url, method = %entry.method, "builder loaded from history");
            self.form = RequestDescriptor::from(&entry);
        }
    }

    pub fn clear(&mut self) {
        self.form = RequestDescriptor::default();
    }

    /// The request as it would be dispatched right now.
    pub fn descriptor(&self) -> RequestDescriptor {
        self.form.clone()
    }

    pub fn url(&self) -> &str {
        &self.form.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.form.url = url.into();
    }

    pub fn method(&self) -> HttpMethod {
        self.form.method
    }

    pub fn set_method(&mut self, method: HttpMethod) {
        self.form.method = method;
    }

    pub fn body(&self) -> &str {
        &self.form.body
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.form.body = body.into();
    }

    /// The body editor is disabled for GET.
    pub fn body_enabled(&self) -> bool {
        self.form.method.allows_body()
    }

    pub fn beautify_body(&mut self) {
        self.form.body = validate::beautify(&self.form.body);
    }

    pub fn minify_body(&mut self) {
        self.form.body = validate::minify(&self.form.body);
    }

    pub fn headers(&self) -> &[HeaderPair] {
        &self.form.headers
    }

    pub fn add_header(&mut self) {
        self.form.headers.push(HeaderPair::default());
    }

    /// Out-of-range indices are ignored.
    pub fn remove_header(&mut self, index: usize) {
        if index < self.form.headers.len() {
            self.form.headers.remove(index);
        }
    }

    pub fn set_header_key(&mut self, index: usize, key: impl Into<String>) {
        if let Some(row) = self.form.headers.get_mut(index) {
            row.key = key.into();
        }
    }

    pub fn set_header_value(&mut self, index: usize, value: impl Into<String>) {
        if let Some(row) = self.form.headers.get_mut(index) {
            row.value = value.into();
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }
}
