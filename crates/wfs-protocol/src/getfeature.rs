//! WFS GetFeature request.
//!
//! Only ad-hoc queries are modelled, and only one per request. The filter is
//! either a bounding box or a list of resource identifiers.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use ows_common::exception::{invalid_parameter_value, missing_parameter_value};
use ows_common::kvp_binding;
use ows_common::xml::decode_request;
use ows_common::{
    split_list, BaseRequest, BoundingBox, Crs, Exceptions, KvpBinding, OperationKvp,
    OperationRequest, OwsResult, QueryValues, XmlBuilder,
};

use crate::base::{
    base_request, check_request, empty_query, parse_crs, parse_optional_u32, split_type_names,
    validate_base, validate_output_format, validate_type_names, RESERVED_ATTRIBUTES,
};
use crate::capabilities::WfsCapabilities;
use crate::exceptions::operation_parsing_failed;
use crate::{
    BBOX, COUNT, GETFEATURE, HITS, OUTPUTFORMAT, PROPERTYNAME, REQUEST, RESOURCEID, RESULTS,
    RESULTTYPE, SERVICE, SORTBY, SRSNAME, STARTINDEX, TYPENAMES, VERSION,
};

/// Flat KVP form of GetFeature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetFeatureKvp {
    pub service: String,
    pub version: String,
    pub request: String,
    pub type_names: String,
    pub srs_name: Option<String>,
    pub property_name: Option<String>,
    pub sort_by: Option<String>,
    pub bbox: Option<String>,
    pub resource_id: Option<String>,
    pub count: Option<String>,
    pub start_index: Option<String>,
    pub result_type: Option<String>,
    pub output_format: Option<String>,
}

impl OperationKvp for GetFeatureKvp {
    const BINDINGS: &'static [KvpBinding<Self>] = &[
        kvp_binding!(GetFeatureKvp, required SERVICE => service),
        kvp_binding!(GetFeatureKvp, required VERSION => version),
        kvp_binding!(GetFeatureKvp, required REQUEST => request),
        kvp_binding!(GetFeatureKvp, required TYPENAMES => type_names),
        kvp_binding!(GetFeatureKvp, optional SRSNAME => srs_name),
        kvp_binding!(GetFeatureKvp, optional PROPERTYNAME => property_name),
        kvp_binding!(GetFeatureKvp, optional SORTBY => sort_by),
        kvp_binding!(GetFeatureKvp, optional BBOX => bbox),
        kvp_binding!(GetFeatureKvp, optional RESOURCEID => resource_id),
        kvp_binding!(GetFeatureKvp, optional COUNT => count),
        kvp_binding!(GetFeatureKvp, optional STARTINDEX => start_index),
        kvp_binding!(GetFeatureKvp, optional RESULTTYPE => result_type),
        kvp_binding!(GetFeatureKvp, optional OUTPUTFORMAT => output_format),
    ];
}

/// Selection of the features of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    BoundingBox(BoundingBox),
    ResourceId(Vec<String>),
}

/// An ad-hoc query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub type_names: Vec<String>,
    #[serde(default)]
    pub srs_name: Option<Crs>,
    #[serde(default)]
    pub property_names: Vec<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub filter: Option<Filter>,
}

/// A WFS 2.0.0 GetFeature request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetFeature {
    #[serde(flatten)]
    pub base: BaseRequest,
    pub query: Query,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub start_index: Option<u32>,
    /// `results` or `hits`; anything else fails validation.
    #[serde(default)]
    pub result_type: Option<String>,
    #[serde(default)]
    pub output_format: Option<String>,
}

/// BBOX and RESOURCEID exclude each other.
fn conflicting_filters() -> ows_common::Exception {
    operation_parsing_failed("BBOX,RESOURCEID", GETFEATURE)
}

impl GetFeature {
    pub fn from_kvp(kvp: &GetFeatureKvp) -> Result<Self, Exceptions> {
        let mut exceptions = Exceptions::new();

        check_request(&kvp.request, GETFEATURE, &mut exceptions);
        let base = base_request(&kvp.service, &kvp.version, &mut exceptions);

        let filter = match (kvp.bbox.as_deref(), kvp.resource_id.as_deref()) {
            (Some(_), Some(_)) => {
                exceptions.push(conflicting_filters());
                None
            }
            (Some(bbox), None) => match BoundingBox::parse_kvp(bbox) {
                Ok(bbox) => Some(Filter::BoundingBox(bbox)),
                Err(exception) => {
                    exceptions.push(exception);
                    None
                }
            },
            (None, Some(ids)) => Some(Filter::ResourceId(split_list(ids))),
            (None, None) => None,
        };

        let query = Query {
            type_names: split_list(&kvp.type_names),
            srs_name: parse_crs(kvp.srs_name.as_deref().unwrap_or(""), SRSNAME, &mut exceptions),
            property_names: kvp.property_name.as_deref().map(split_list).unwrap_or_default(),
            sort_by: kvp.sort_by.clone(),
            filter,
        };

        let request = Self {
            base,
            query,
            count: parse_optional_u32(kvp.count.as_deref(), COUNT, &mut exceptions),
            start_index: parse_optional_u32(kvp.start_index.as_deref(), STARTINDEX, &mut exceptions),
            result_type: kvp.result_type.clone(),
            output_format: kvp.output_format.clone(),
        };
        exceptions.into_result(request)
    }

    pub fn to_kvp(&self) -> GetFeatureKvp {
        let (bbox, resource_id) = match &self.query.filter {
            Some(Filter::BoundingBox(bbox)) => (Some(bbox.to_kvp_with_crs()), None),
            Some(Filter::ResourceId(ids)) => (None, Some(ids.join(","))),
            None => (None, None),
        };

        GetFeatureKvp {
            service: self.base.service.clone(),
            version: self.base.version.clone(),
            request: GETFEATURE.to_string(),
            type_names: self.query.type_names.join(","),
            srs_name: self.query.srs_name.as_ref().map(Crs::to_urn),
            property_name: Some(self.query.property_names.join(",")).filter(|p| !p.is_empty()),
            sort_by: self.query.sort_by.clone(),
            bbox,
            resource_id,
            count: self.count.map(|c| c.to_string()),
            start_index: self.start_index.map(|s| s.to_string()),
            result_type: self.result_type.clone(),
            output_format: self.output_format.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GetFeatureXml {
    #[serde(rename = "@service", default)]
    service: String,
    #[serde(rename = "@version", default)]
    version: String,
    #[serde(rename = "@count", default)]
    count: Option<String>,
    #[serde(rename = "@startIndex", default)]
    start_index: Option<String>,
    #[serde(rename = "@resultType", default)]
    result_type: Option<String>,
    #[serde(rename = "@outputFormat", default)]
    output_format: Option<String>,
    #[serde(rename = "Query", default)]
    queries: Vec<QueryXml>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryXml {
    #[serde(rename = "@typeNames", default)]
    type_names: String,
    #[serde(rename = "@srsName", default)]
    srs_name: Option<String>,
    #[serde(rename = "PropertyName", default)]
    property_names: Vec<String>,
    #[serde(rename = "Filter", default)]
    filter: Option<FilterXml>,
    #[serde(rename = "SortBy", default)]
    sort_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FilterXml {
    #[serde(rename = "ResourceId", default)]
    resource_ids: Vec<ResourceIdXml>,
    #[serde(rename = "BBOX", default)]
    bbox: Option<BboxXml>,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceIdXml {
    #[serde(rename = "@rid", default)]
    rid: String,
}

#[derive(Debug, Default, Deserialize)]
struct BboxXml {
    #[serde(rename = "Envelope", default)]
    envelope: EnvelopeXml,
}

#[derive(Debug, Default, Deserialize)]
struct EnvelopeXml {
    #[serde(rename = "@srsName", default)]
    srs_name: Option<String>,
    #[serde(rename = "lowerCorner", default)]
    lower_corner: String,
    #[serde(rename = "upperCorner", default)]
    upper_corner: String,
}

impl EnvelopeXml {
    fn into_bbox(self, exceptions: &mut Exceptions) -> BoundingBox {
        let mut corner = |text: &str| {
            BoundingBox::parse_corner(text).unwrap_or_else(|| {
                exceptions.push(invalid_parameter_value(text, BBOX));
                [0.0, 0.0]
            })
        };
        let lower_corner = corner(&self.lower_corner);
        let upper_corner = corner(&self.upper_corner);

        BoundingBox {
            lower_corner,
            upper_corner,
            crs: parse_crs(self.srs_name.as_deref().unwrap_or(""), BBOX, exceptions),
        }
    }
}

impl FilterXml {
    fn into_filter(self, exceptions: &mut Exceptions) -> Option<Filter> {
        match (self.bbox, self.resource_ids.is_empty()) {
            (Some(_), false) => {
                exceptions.push(conflicting_filters());
                None
            }
            (Some(bbox), true) => Some(Filter::BoundingBox(bbox.envelope.into_bbox(exceptions))),
            (None, false) => Some(Filter::ResourceId(
                self.resource_ids.into_iter().map(|r| r.rid).collect(),
            )),
            (None, true) => None,
        }
    }
}

impl QueryXml {
    fn into_query(self, exceptions: &mut Exceptions) -> Query {
        Query {
            type_names: split_type_names(&self.type_names),
            srs_name: parse_crs(self.srs_name.as_deref().unwrap_or(""), SRSNAME, exceptions),
            property_names: self.property_names,
            sort_by: self.sort_by,
            filter: self.filter.and_then(|f| f.into_filter(exceptions)),
        }
    }
}

fn write_query(builder: &mut XmlBuilder, query: &Query) -> OwsResult<()> {
    let type_names = query.type_names.join(" ");
    let srs_name = query.srs_name.as_ref().map(Crs::to_urn);
    let mut attributes = vec![("typeNames", type_names.as_str())];
    if let Some(srs_name) = &srs_name {
        attributes.push(("srsName", srs_name.as_str()));
    }

    builder.start("Query", &attributes, &[])?;
    for name in &query.property_names {
        builder.text_element("PropertyName", name)?;
    }

    match &query.filter {
        Some(Filter::ResourceId(ids)) => {
            builder.start("Filter", &[], &[])?;
            for id in ids {
                builder.start("ResourceId", &[("rid", id.as_str())], &[])?;
                builder.end("ResourceId")?;
            }
            builder.end("Filter")?;
        }
        Some(Filter::BoundingBox(bbox)) => {
            let srs_name = bbox.crs.as_ref().map(Crs::to_urn);
            let envelope: Vec<(&str, &str)> = srs_name
                .as_deref()
                .map(|s| vec![("srsName", s)])
                .unwrap_or_default();

            builder.start("Filter", &[], &[])?;
            builder.start("BBOX", &[], &[])?;
            builder.start("Envelope", &envelope, &[])?;
            builder.text_element("lowerCorner", &BoundingBox::corner_text(bbox.lower_corner))?;
            builder.text_element("upperCorner", &BoundingBox::corner_text(bbox.upper_corner))?;
            builder.end("Envelope")?;
            builder.end("BBOX")?;
            builder.end("Filter")?;
        }
        None => {}
    }

    builder.optional_element("SortBy", query.sort_by.as_deref())?;
    builder.end("Query")
}

impl OperationRequest for GetFeature {
    type Capabilities = dyn WfsCapabilities;

    fn request_type(&self) -> &'static str {
        GETFEATURE
    }

    #[instrument(skip_all)]
    fn parse_kvp(query: &QueryValues) -> Result<Self, Exceptions> {
        if query.is_empty() {
            return Err(empty_query());
        }
        let kvp = GetFeatureKvp::parse_query(query)?;
        let request = Self::from_kvp(&kvp)?;
        debug!(type_names = request.query.type_names.len(), "parsed GetFeature KVP");
        Ok(request)
    }

    #[instrument(skip_all)]
    fn parse_xml(body: &[u8]) -> Result<Self, Exceptions> {
        let reserved = [
            RESERVED_ATTRIBUTES,
            &["count", "startIndex", "resultType", "outputFormat"][..],
        ]
        .concat();
        let (xml, attributes): (GetFeatureXml, _) = decode_request(body, GETFEATURE, &reserved)?;

        if xml.queries.len() > 1 {
            return Err(operation_parsing_failed("Query", GETFEATURE).into());
        }

        let mut exceptions = Exceptions::new();
        let mut base = base_request(&xml.service, &xml.version, &mut exceptions);
        base.attributes = attributes;

        let query = xml
            .queries
            .into_iter()
            .next()
            .map(|q| q.into_query(&mut exceptions))
            .unwrap_or_default();

        let request = Self {
            base,
            query,
            count: parse_optional_u32(xml.count.as_deref(), COUNT, &mut exceptions),
            start_index: parse_optional_u32(xml.start_index.as_deref(), STARTINDEX, &mut exceptions),
            result_type: xml.result_type,
            output_format: xml.output_format,
        };
        exceptions.into_result(request)
    }

    fn build_kvp(&self) -> QueryValues {
        self.to_kvp().to_query()
    }

    fn build_xml(&self) -> OwsResult<Vec<u8>> {
        let count = self.count.map(|c| c.to_string());
        let start_index = self.start_index.map(|s| s.to_string());

        let mut attributes = self.base.root_attributes().to_vec();
        let optional = [
            ("count", count.as_deref()),
            ("startIndex", start_index.as_deref()),
            ("resultType", self.result_type.as_deref()),
            ("outputFormat", self.output_format.as_deref()),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                attributes.push((name, value));
            }
        }

        let mut builder = XmlBuilder::new()?;
        builder.start(GETFEATURE, &attributes, &self.base.attributes)?;
        write_query(&mut builder, &self.query)?;
        builder.end(GETFEATURE)?;
        builder.finish()
    }

    fn validate(&self, capabilities: &Self::Capabilities) -> Exceptions {
        let mut exceptions = Exceptions::new();

        validate_base(&self.base, capabilities, &mut exceptions);

        if self.query.type_names.is_empty() {
            exceptions.push(missing_parameter_value(TYPENAMES));
        }
        validate_type_names(&self.query.type_names, capabilities, &mut exceptions);
        validate_output_format(
            GETFEATURE,
            self.output_format.as_deref(),
            capabilities,
            &mut exceptions,
        );

        if let Some(crs) = &self.query.srs_name {
            let unsupported = self
                .query
                .type_names
                .iter()
                .filter(|name| capabilities.has_feature_type(name))
                .any(|name| !capabilities.supports_feature_type_crs(name, crs));
            if unsupported {
                exceptions.push(invalid_parameter_value(&crs.to_string(), SRSNAME));
            }
        }

        if let Some(count) = self.count {
            let over_limit = capabilities.count_default().map(|max| count > max).unwrap_or(false);
            if count == 0 || over_limit {
                exceptions.push(invalid_parameter_value(&count.to_string(), COUNT));
            }
        }

        if let Some(Filter::BoundingBox(bbox)) = &self.query.filter {
            if bbox.is_degenerate() {
                exceptions.push(invalid_parameter_value(&bbox.to_kvp(), BBOX));
            }
        }

        if let Some(result_type) = &self.result_type {
            if result_type != RESULTS && result_type != HITS {
                exceptions.push(invalid_parameter_value(result_type, RESULTTYPE));
            }
        }

        if !exceptions.is_empty() {
            debug!(count = exceptions.len(), "GetFeature failed validation");
        }
        exceptions
    }
}
