//! Resources every loader knows about unless told otherwise.

use crate::descriptor::{ResourceDescriptor, ResourceSource};

struct Builtin {
    name: &'static str,
    url: &'static str,
    exposed_as: &'static str,
    description: &'static str,
    requires: &'static [&'static str],
}

const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "axios",
        url: "https://cdn.jsdelivr.net/npm/axios@1.6.7/dist/axios.min.js",
        exposed_as: "axios",
        description: "Promise based HTTP client",
        requires: &[],
    },
    Builtin {
        name: "lodash",
        url: "https://cdn.jsdelivr.net/npm/lodash@4.17.21/lodash.min.js",
        exposed_as: "_",
        description: "Utility library",
        requires: &[],
    },
    Builtin {
        name: "dayjs",
        url: "https://cdn.jsdelivr.net/npm/dayjs@1.11.10/dayjs.min.js",
        exposed_as: "dayjs",
        description: "Date parsing and formatting",
        requires: &[],
    },
    Builtin {
        name: "vue",
        url: "https://cdn.jsdelivr.net/npm/vue@3.4.21/dist/vue.global.prod.js",
        exposed_as: "Vue",
        description: "Vue 3 runtime",
        requires: &[],
    },
    Builtin {
        name: "react",
        url: "https://cdn.jsdelivr.net/npm/react@18.2.0/umd/react.production.min.js",
        exposed_as: "React",
        description: "React runtime",
        requires: &[],
    },
    Builtin {
        name: "react-dom",
        url: "https://cdn.jsdelivr.net/npm/react-dom@18.2.0/umd/react-dom.production.min.js",
        exposed_as: "ReactDOM",
        description: "React DOM renderer",
        requires: &["react"],
    },
];

/// Descriptors for the built-in resource table, all on-demand.
#[must_use]
pub fn builtin_resources() -> Vec<ResourceDescriptor> {
    BUILTINS
        .iter()
        .map(|builtin| {
            ResourceDescriptor::new(
                builtin.name,
                ResourceSource::Url(builtin.url.to_owned()),
                builtin.exposed_as,
            )
            .with_description(builtin.description)
            .with_requires(builtin.requires.iter().copied())
        })
        .collect()
}
