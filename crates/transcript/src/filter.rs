use context_protocol::{group_context_messages, ContextMessage, ContextSource, IgnoreFilter};

/// Drop ignored context, keeping everything else in order.
///
/// A human message with file info is dropped when its URI is ignored, or when
/// it came from embeddings and its repo-relative path is ignored. Its paired
/// assistant message goes with it; unpaired neighbours are never touched.
/// Filtering a filtered list changes nothing.
pub fn filter_ignored_context(
    messages: Vec<ContextMessage>,
    ignore: &IgnoreFilter,
) -> Vec<ContextMessage> {
    if ignore.is_empty() {
        return messages;
    }
    let mut kept = Vec::with_capacity(messages.len());
    for unit in group_context_messages(messages) {
        if is_ignored_message(unit.lead(), ignore) {
            log::debug!(
                "Dropping ignored context {}",
                unit.lead()
                    .file
                    .as_ref()
                    .map(|file| file.file_name.as_str())
                    .unwrap_or_default()
            );
            continue;
        }
        unit.push_into(&mut kept);
    }
    kept
}

fn is_ignored_message(message: &ContextMessage, ignore: &IgnoreFilter) -> bool {
    if !message.is_human() {
        return false;
    }
    let Some(file) = &message.file else {
        return false;
    };
    if ignore.is_ignored(&file.uri) {
        return true;
    }
    file.source == Some(ContextSource::Embeddings)
        && file
            .repo_name
            .as_deref()
            .is_some_and(|repo| ignore.is_ignored_path(repo, &file.file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_protocol::{flatten_fragments, ContextFile, ContextFragment};
    use pretty_assertions::assert_eq;

    fn ignore() -> IgnoreFilter {
        IgnoreFilter::allow_all()
            .with_repo_rules("acme/app", "/repo", "secret/\n")
            .unwrap()
    }

    fn fragment(rel: &str, source: ContextSource) -> ContextFragment {
        ContextFragment::new(
            format!("snippet of {rel}"),
            ContextFile::new(format!("/repo/{rel}"), rel)
                .with_repo_name("acme/app")
                .with_source(source),
            "Ok.",
        )
    }

    #[test]
    fn drops_ignored_pair_and_keeps_the_rest() {
        let messages = flatten_fragments([
            fragment("secret/key.rs", ContextSource::FileScan),
            fragment("src/lib.rs", ContextSource::FileScan),
        ]);
        let filtered = filter_ignored_context(messages, &ignore());
        assert_eq!(
            filtered,
            flatten_fragments([fragment("src/lib.rs", ContextSource::FileScan)])
        );
    }

    #[test]
    fn embeddings_hits_are_checked_by_repo_path() {
        let mut remote = fragment("secret/key.rs", ContextSource::Embeddings);
        if let Some(file) = remote.human.file.as_mut() {
            file.uri = "/remote/checkout/secret/key.rs".into();
        }
        let mut scanned = remote.clone();
        if let Some(file) = scanned.human.file.as_mut() {
            file.source = Some(ContextSource::Search);
        }

        let filtered = filter_ignored_context(flatten_fragments([remote, scanned.clone()]), &ignore());
        assert_eq!(filtered, flatten_fragments([scanned]));
    }

    #[test]
    fn unpaired_neighbour_survives_an_ignored_fragment() {
        let messages = vec![
            ContextMessage::human(
                "orphan",
                Some(ContextFile::new("/repo/secret/a.rs", "secret/a.rs")),
            ),
            ContextMessage::human("question without file", None),
        ];
        let filtered = filter_ignored_context(messages, &ignore());
        assert_eq!(
            filtered,
            vec![ContextMessage::human("question without file", None)]
        );
    }

    #[test]
    fn filtering_is_idempotent() {
        let messages = vec![
            ContextMessage::human("kept", Some(ContextFile::new("/repo/src/a.rs", "src/a.rs"))),
            ContextMessage::human("gone", Some(ContextFile::new("/repo/secret/b.rs", "secret/b.rs"))),
            ContextMessage::assistant("Ok."),
            ContextMessage::assistant("stray"),
        ];
        let once = filter_ignored_context(messages, &ignore());
        assert_eq!(once.len(), 2);
        let twice = filter_ignored_context(once.clone(), &ignore());
        assert_eq!(once, twice);
    }
}
