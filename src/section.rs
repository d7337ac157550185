use std::slice;

use crate::setting::Setting;

/// A named, ordered group of settings. Setting names need not be unique; lookups by name return
/// the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    name: String,
    settings: Vec<Setting>,
    comment: Option<String>,
    pre_comment: Option<String>,
}

impl Section {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    #[must_use]
    pub fn pre_comment(&self) -> Option<&str> {
        self.pre_comment.as_deref()
    }

    pub fn set_pre_comment(&mut self, pre_comment: Option<String>) {
        self.pre_comment = pre_comment;
    }

    #[must_use]
    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Setting> {
        self.settings.iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, Setting> {
        self.settings.iter_mut()
    }

    #[must_use]
    pub fn setting_at(&self, index: usize) -> Option<&Setting> {
        self.settings.get(index)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Setting> {
        self.settings.iter().find(|setting| setting.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Setting> {
        self.settings.iter_mut().find(|setting| setting.name() == name)
    }

    /// The first setting called `name`, appending an empty one if there is none.
    pub fn entry(&mut self, name: &str) -> &mut Setting {
        let index = match self.position(name) {
            Some(index) => index,
            None => {
                self.settings.push(Setting::new(name));
                self.settings.len() - 1
            }
        };

        &mut self.settings[index]
    }

    /// Every setting called `name`, in document order.
    pub fn settings_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Setting> {
        self.settings
            .iter()
            .filter(move |setting| setting.name() == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.settings.iter().position(|setting| setting.name() == name)
    }

    /// Append `setting`, even if one with the same name exists.
    pub fn add(&mut self, setting: Setting) -> &mut Setting {
        self.settings.push(setting);
        let last = self.settings.len() - 1;
        &mut self.settings[last]
    }

    /// Remove the first setting called `name`.
    pub fn remove(&mut self, name: &str) -> bool {
        self.position(name)
            .map(|index| self.settings.remove(index))
            .is_some()
    }

    /// Remove every setting called `name`, returning how many were removed.
    pub fn remove_all_named(&mut self, name: &str) -> usize {
        let before = self.settings.len();
        self.settings.retain(|setting| setting.name() != name);
        before - self.settings.len()
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Setting> {
        (index < self.settings.len()).then(|| self.settings.remove(index))
    }

    pub fn clear(&mut self) {
        self.settings.clear();
    }
}

impl<'a> IntoIterator for &'a Section {
    type Item = &'a Setting;
    type IntoIter = slice::Iter<'a, Setting>;

    fn into_iter(self) -> Self::IntoIter {
        self.settings.iter()
    }
}

impl<'a> IntoIterator for &'a mut Section {
    type Item = &'a mut Setting;
    type IntoIter = slice::IterMut<'a, Setting>;

    fn into_iter(self) -> Self::IntoIter {
        self.settings.iter_mut()
    }
}

impl Extend<Setting> for Section {
    fn extend<I: IntoIterator<Item = Setting>>(&mut self, iter: I) {
        self.settings.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_preserved() {
        let mut section = Section::new("Section");
        section.extend([
            Setting::with_value("key", "1"),
            Setting::with_value("other", "2"),
            Setting::with_value("key", "3"),
        ]);

        assert_eq!(section.len(), 3);
        assert_eq!(section.get("key").map(|s| s.raw_value().into_owned()).as_deref(), Some("1"));
        assert_eq!(
            section
                .settings_named("key")
                .map(|s| s.raw_value().into_owned())
                .collect::<Vec<_>>(),
            ["1", "3"]
        );

        assert!(section.remove("key"));
        assert_eq!(section.get("key").map(|s| s.raw_value().into_owned()).as_deref(), Some("3"));

        section.add(Setting::new("key"));
        assert_eq!(section.remove_all_named("key"), 2);
        assert!(!section.contains("key"));
        assert!(section.contains("other"));
    }

    #[test]
    fn entry_creates_once() {
        let mut section = Section::new("Section");

        section.entry("Setting1").set_raw_value("0");
        section.entry("Setting1").set_raw_value("1");

        assert_eq!(section.len(), 1);
        assert_eq!(section.get("Setting1").map(|s| s.raw_value().into_owned()).as_deref(), Some("1"));
    }

    #[test]
    fn remove_by_index() {
        let mut section = Section::new("Section");
        section.extend([Setting::new("a"), Setting::new("b")]);

        assert_eq!(section.remove_at(0).map(|s| s.name().to_owned()).as_deref(), Some("a"));
        assert!(section.remove_at(5).is_none());
        assert_eq!(section.setting_at(0).map(Setting::name), Some("b"));
    }
}
