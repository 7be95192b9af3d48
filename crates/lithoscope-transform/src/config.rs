//! Default mapper policy.

use std::collections::HashMap;
use std::sync::Arc;

use lithoscope_common::config::HarvestConfig;

use crate::mapper::Mapper;
use crate::mappers::basic_metadata::{
    AdditionalDescriptionsMapper, AdditionalTitlesMapper, CopyrightMapper, DescriptionMapper,
    LanguagesMapper, PublicationDateMapper, PublisherMapper, ResourceTypeMapper, SubjectsMapper,
    TitleMapper,
};
use crate::mappers::contributors::{AuthorsMapper, ContributorsMapper};
use crate::mappers::custom_fields::{CernFieldsMapper, ImprintMapper};
use crate::mappers::files::FilesMapper;
use crate::mappers::identifiers::{DoiMapper, IdentifiersMapper, RelatedIdentifiersMapper};
use crate::mappers::thesis::{ThesisDefenceDateMapper, ThesisPublicationDateMapper};
use crate::policies::MapperPolicy;
use crate::resource_types::ResourceType;
use crate::vocabulary::VocabularyService;

/// The production policy: one base pipeline, extended for theses with the
/// defence date mapper and a thesis-aware publication date replacement.
pub fn default_mapper_policy(
    config: Arc<HarvestConfig>,
    vocabularies: Arc<dyn VocabularyService>,
) -> MapperPolicy {
    let base: Vec<Arc<dyn Mapper>> = vec![
        Arc::new(FilesMapper { config: config.clone() }),
        Arc::new(ResourceTypeMapper),
        Arc::new(DoiMapper { config: config.clone() }),
        Arc::new(TitleMapper),
        Arc::new(AdditionalTitlesMapper),
        Arc::new(AuthorsMapper),
        Arc::new(ContributorsMapper),
        Arc::new(PublisherMapper { config: config.clone() }),
        Arc::new(PublicationDateMapper),
        Arc::new(CopyrightMapper),
        Arc::new(DescriptionMapper),
        Arc::new(AdditionalDescriptionsMapper),
        Arc::new(SubjectsMapper),
        Arc::new(LanguagesMapper),
        Arc::new(ImprintMapper),
        Arc::new(CernFieldsMapper { vocabularies }),
        Arc::new(IdentifiersMapper { config: config.clone() }),
        Arc::new(RelatedIdentifiersMapper { config }),
    ];

    MapperPolicy {
        base,
        add: HashMap::from([(
            ResourceType::Thesis,
            vec![Arc::new(ThesisDefenceDateMapper) as Arc<dyn Mapper>],
        )]),
        replace: HashMap::from([(
            (ResourceType::Thesis, "metadata.publication_date"),
            Arc::new(ThesisPublicationDateMapper) as Arc<dyn Mapper>,
        )]),
        remove: HashMap::new(),
    }
}
