use std::sync::Arc;

use log::{info, warn};

use crate::aggregator::Aggregator;
use crate::clients::{KeywordExtractor, entities::Track};

/// Turns a free-text mood into a tracklist.
///
/// The language model only picks the search keyword. Whatever happens on
/// that side, the raw mood is searched instead, so the caller always gets the
/// aggregator's answer for one of the two.
#[derive(Clone)]
pub struct MoodResolver {
    extractor: Arc<dyn KeywordExtractor>,
    aggregator: Aggregator,
}

impl MoodResolver {
    /// Pairs a keyword extractor with the aggregator that searches its output.
    pub fn new(extractor: Arc<dyn KeywordExtractor>, aggregator: Aggregator) -> Self {
        MoodResolver {
            extractor,
            aggregator,
        }
    }

    /// Keyword that will be searched for `mood`.
    pub async fn keyword_for(&self, mood: &str) -> String {
        match self.extractor.extract_keyword(mood).await {
            Ok(Some(keyword)) => {
                info!("Agent decided to search for: {keyword}");
                keyword
            }
            Ok(None) => {
                info!("Agent did not choose a keyword, using raw mood");
                mood.to_string()
            }
            Err(e) => {
                warn!("Keyword extraction failed, using raw mood: {e}");
                mood.to_string()
            }
        }
    }

    /// Full mood to tracklist pipeline; never fails.
    pub async fn playlist_from_mood(&self, mood: &str) -> Vec<Track> {
        info!("Agent received mood: {mood}");
        let keyword = self.keyword_for(mood).await;
        self.aggregator.search_tracks_by_playlist(&keyword).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::tests::{StubCatalog, track};
    use crate::aggregator::{DEFAULT_FAN_OUT, DEFAULT_TARGET_COUNTRY};
    use crate::clients::errors::{Error, Result};
    use async_trait::async_trait;

    enum StubExtractor {
        Keyword(&'static str),
        NoToolCall,
        Failing,
    }

    #[async_trait]
    impl KeywordExtractor for StubExtractor {
        async fn extract_keyword(&self, _mood: &str) -> Result<Option<String>> {
            match self {
                StubExtractor::Keyword(k) => Ok(Some((*k).to_string())),
                StubExtractor::NoToolCall => Ok(None),
                StubExtractor::Failing => Err(Error::LanguageModel("quota exceeded".into())),
            }
        }
    }

    fn resolver(extractor: StubExtractor, catalog: &Arc<StubCatalog>) -> MoodResolver {
        let aggregator = Aggregator::new(catalog.clone(), DEFAULT_TARGET_COUNTRY, DEFAULT_FAN_OUT);
        MoodResolver::new(Arc::new(extractor), aggregator)
    }

    fn catalog() -> Arc<StubCatalog> {
        Arc::new(StubCatalog {
            tag_tracks: vec![track(1, 10), track(2, 20)],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn searches_extracted_keyword() {
        let catalog = catalog();
        let tracks = resolver(StubExtractor::Keyword("Breakup"), &catalog)
            .playlist_from_mood("I just broke up")
            .await;

        assert_eq!(*catalog.searched.lock().unwrap(), vec!["Breakup".to_string()]);
        assert_eq!(tracks, catalog.tag_tracks);
    }

    #[tokio::test]
    async fn searches_raw_mood_without_tool_call() {
        let catalog = catalog();
        resolver(StubExtractor::NoToolCall, &catalog)
            .playlist_from_mood("Coding all night")
            .await;

        assert_eq!(
            *catalog.searched.lock().unwrap(),
            vec!["Coding all night".to_string()]
        );
    }

    #[tokio::test]
    async fn model_failure_matches_raw_mood_aggregation() {
        let failing = catalog();
        let from_failure = resolver(StubExtractor::Failing, &failing)
            .playlist_from_mood("Jantar romântico")
            .await;

        let direct = catalog();
        let aggregator = Aggregator::new(direct.clone(), DEFAULT_TARGET_COUNTRY, DEFAULT_FAN_OUT);
        let from_raw = aggregator.search_tracks_by_playlist("Jantar romântico").await;

        assert_eq!(from_failure, from_raw);
        assert_eq!(
            *failing.searched.lock().unwrap(),
            vec!["Jantar romântico".to_string()]
        );
    }
}
