use clap::ValueEnum;

use crate::chart::{AggregatedSeries, ChartSpec, TabularDataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocumentAnalysis {
    Summarize,
    KeyPoints,
    ActionItems,
}

impl DocumentAnalysis {
    fn query(self) -> &'static str {
        match self {
            Self::Summarize => "Summarize",
            Self::KeyPoints => "Extract Key Points",
            Self::ActionItems => "Find Action Items",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImageAnalysis {
    Summarize,
    Contacts,
    ImportantData,
}

impl ImageAnalysis {
    fn instruction(self) -> &'static str {
        match self {
            Self::Summarize => "Provide a concise summary of the key information",
            Self::Contacts => "Extract all email addresses, phone numbers, and contact information",
            Self::ImportantData => "Identify important numbers, dates, and figures",
        }
    }
}

/// Either a preset analysis or a free-form query typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query<P> {
    Preset(P),
    Custom(String),
}

pub fn structure(excerpt: &str) -> String {
    format!(
        "Split the document below into its logical sections.\n\
         Return a JSON object of the form \
         {{\"sections\": [{{\"heading\": string, \"content\": string, \"type\": string}}]}} \
         where type is one of paragraph, section, title, heading, list.\n\
         Copy the content verbatim and keep the original order.\n\n\
         Document:\n{}",
        excerpt
    )
}

pub fn document_analysis(query: &Query<DocumentAnalysis>, text: &str) -> String {
    let query = match query {
        Query::Preset(preset) => preset.query(),
        Query::Custom(custom) => custom.as_str(),
    };
    format!(
        "Perform this analysis on the document: {}\n\n\
         Document Content:\n{}\n\n\
         Instructions:\n\
         1. Be concise and structured\n\
         2. Use bullet points for key information\n\
         3. Highlight important names, dates, and figures",
        query, text
    )
}

pub fn image_analysis(query: &Query<ImageAnalysis>, text: &str) -> String {
    let instruction = match query {
        Query::Preset(preset) => preset.instruction(),
        Query::Custom(custom) => custom.as_str(),
    };
    format!(
        "Perform this analysis: {}\n\n\
         Extracted Text:\n{}\n\n\
         Instructions:\n\
         1. Be precise and structured\n\
         2. Format results clearly\n\
         3. Highlight key information",
        instruction, text
    )
}

/// System message that grounds a follow-up conversation in the document.
pub fn conversation_context(name: &str, text: &str) -> String {
    format!(
        "You answer questions about the document \"{}\". \
         Base every answer on its content and say so when it does not contain the answer.\n\n\
         Document Content:\n{}",
        name, text
    )
}

pub fn aggregation_suggestions(dataset: &TabularDataset) -> String {
    format!(
        "Analyze this dataset and suggest 3-5 meaningful ways to aggregate the data for visualization.\n\
         Focus on the most statistically significant columns and logical groupings.\n\
         For each suggestion, recommend the best chart type (column, pie, line, or scatter plot) and justify your choice.\n\n\
         Dataset sample:\n{}\n\n\
         Dataset columns: {:?}\n\
         Numeric columns: {:?}\n\
         Categorical columns: {:?}\n\n\
         Provide your suggestions in this format:\n\
         1. [Aggregation Method]: [Column(s) to aggregate] by [Grouping Column]\n\
         - Chart Type: [Column/Pie/Line/Scatter]\n\
         - Reason: [one sentence]\n\n\
         Chart Selection Guidelines:\n\
         - Column Chart: compare discrete categories or limited time periods.\n\
         - Pie Chart: show parts of a whole (only if 5 or fewer categories and percentages matter).\n\
         - Line Chart: display trends over continuous time.\n\
         - Scatter Plot: reveal relationships between two numeric variables.",
        dataset.head(5),
        dataset.column_names(),
        dataset.numeric_columns(),
        dataset.categorical_columns(),
    )
}

pub fn chart_insights(spec: &ChartSpec, series: &AggregatedSeries, dataset: &TabularDataset) -> String {
    let aggregation = match spec.effective_aggregation() {
        crate::chart::Aggregation::None => "No aggregation".to_string(),
        other => other.to_string(),
    };
    format!(
        "Analyze this {} chart showing {}.\n\n\
         Dataset characteristics:\n\
         - Rows: {}\n\
         - Columns: {:?}\n\
         - Aggregation: {}\n\n\
         Plotted values:\n{}\n\n\
         Provide 3-5 key insights about:\n\
         1. The overall patterns in the data\n\
         2. Any notable outliers or anomalies\n\
         3. Potential business implications",
        spec.chart_type,
        series.title,
        dataset.row_count(),
        dataset.column_names(),
        aggregation,
        series.summary(20),
    )
}
