//! Namespace IRIs used by the store, the facade helpers and the views.

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_SEQ: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Seq";

pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
pub const RDFS_RESOURCE: &str = "http://www.w3.org/2000/01/rdf-schema#Resource";

pub const XSD_GYEAR: &str = "http://www.w3.org/2001/XMLSchema#gYear";
pub const XSD_GMONTH: &str = "http://www.w3.org/2001/XMLSchema#gMonth";
pub const XSD_GDAY: &str = "http://www.w3.org/2001/XMLSchema#gDay";
pub const XSD_NON_NEGATIVE_INTEGER: &str =
    "http://www.w3.org/2001/XMLSchema#nonNegativeInteger";

pub const XCAT: &str = "http://xeroxc.at/schema#";
pub const XCAT_ARTIST: &str = "http://xeroxc.at/schema#Artist";
pub const XCAT_RELEASE: &str = "http://xeroxc.at/schema#Release";
pub const XCAT_TRACK: &str = "http://xeroxc.at/schema#Track";
pub const XCAT_TRACK_LIST: &str = "http://xeroxc.at/schema#TrackList";
pub const XCAT_LDATETIME: &str = "http://xeroxc.at/schema#LDateTime";
pub const XCAT_MADE: &str = "http://xeroxc.at/schema#made";
pub const XCAT_TRACKLIST: &str = "http://xeroxc.at/schema#tracklist";

/// The container membership property `rdf:_n` (1-based).
pub fn member(n: usize) -> String {
    format!("{}_{}", RDF, n)
}

/// Resources named after a namespace term, e.g. `xcat("year")`.
pub fn xcat(local: &str) -> String {
    format!("{}{}", XCAT, local)
}
