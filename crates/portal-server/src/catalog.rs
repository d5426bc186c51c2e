//! Static site content: blog post metadata, documentation sections and the sitemap.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use serde::Serialize;

pub const BASE_URL: &str = "https://portal.ai";

const STATIC_PAGES: &[&str] = &["", "/docs", "/playground", "/examples", "/blog"];

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: &'static str,
    pub title: &'static str,
    pub excerpt: &'static str,
    pub date: &'static str,
    pub author: &'static str,
    pub read_time: &'static str,
    pub category: &'static str,
    pub image: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocLink {
    pub name: &'static str,
    pub href: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocSection {
    pub title: &'static str,
    pub description: &'static str,
    pub items: Vec<DocLink>,
}

const AUTHOR: &str = "Ronald Chu Ming Zu";

fn post(
    id: &'static str,
    title: &'static str,
    excerpt: &'static str,
    date: &'static str,
    read_time: &'static str,
    category: &'static str,
    image: &'static str,
) -> BlogPost {
    BlogPost {
        id,
        title,
        excerpt,
        date,
        author: AUTHOR,
        read_time,
        category,
        image,
    }
}

fn section(
    title: &'static str,
    description: &'static str,
    items: &[(&'static str, &'static str)],
) -> DocSection {
    DocSection {
        title,
        description,
        items: items
            .iter()
            .map(|&(name, href)| DocLink { name, href })
            .collect(),
    }
}

lazy_static! {
    static ref POSTS: Vec<BlogPost> = {
        let mut posts = vec![
            post(
                "type-safe-ai",
                "Building Type-Safe AI Applications with PORTAL",
                "Learn how type safety in PORTAL ensures your AI applications are robust and maintainable from the start.",
                "2024-01-15",
                "8 min",
                "Tutorial",
                "/type-safe-ai-development.jpg",
            ),
            post(
                "streaming-responses",
                "Real-Time Streaming Responses: A Complete Guide",
                "Explore how to implement efficient streaming responses for real-time AI interactions with your users.",
                "2024-01-12",
                "10 min",
                "Guide",
                "/streaming-ai-responses.jpg",
            ),
            post(
                "multi-provider",
                "Multi-Provider AI: OpenAI, Claude, Gemini, and Beyond",
                "Switch between AI providers seamlessly using PORTAL's unified interface and tooling.",
                "2024-01-10",
                "12 min",
                "Feature",
                "/multi-provider-ai.jpg",
            ),
            post(
                "tools-functions",
                "Mastering Tools and Function Calling in PORTAL",
                "Deep dive into how tools enable your AI to take actions and interact with external systems.",
                "2024-01-08",
                "15 min",
                "Advanced",
                "/ai-tools-functions.jpg",
            ),
            post(
                "agents",
                "Building Autonomous AI Agents with Agentic Loops",
                "Create intelligent agents that can plan, execute, and iterate towards complex goals automatically.",
                "2024-01-05",
                "14 min",
                "Advanced",
                "/autonomous-ai-agents.jpg",
            ),
            post(
                "rag-systems",
                "RAG Systems: Enhancing AI with Knowledge Bases",
                "Implement Retrieval Augmented Generation to ground your AI in domain-specific knowledge.",
                "2024-01-03",
                "11 min",
                "Tutorial",
                "/rag-knowledge-retrieval.jpg",
            ),
            post(
                "production-patterns",
                "Production Patterns: Deploying PORTAL at Scale",
                "Best practices for deploying PORTAL applications in production environments with high reliability.",
                "2024-01-01",
                "13 min",
                "Guide",
                "/production-deployment-scale.jpg",
            ),
            post(
                "multimodal-ai",
                "Multimodal AI: Text, Images, and Audio with PORTAL",
                "Explore how PORTAL supports multimodal inputs and outputs for richer AI interactions.",
                "2023-12-29",
                "9 min",
                "Feature",
                "/multimodal-ai-media.jpg",
            ),
            post(
                "cost-optimization",
                "Cost Optimization: Getting More from Your AI Budget",
                "Strategies for reducing API costs while maintaining quality in your PORTAL applications.",
                "2023-12-26",
                "7 min",
                "Best Practices",
                "/cost-optimization-budget.jpg",
            ),
            post(
                "future-ai",
                "The Future of AI Development: What's Coming in PORTAL",
                "Insights into upcoming features and the roadmap for next-generation AI applications.",
                "2023-12-23",
                "8 min",
                "News",
                "/future-ai-development.jpg",
            ),
        ];
        // ISO dates order lexicographically
        posts.sort_by(|a, b| b.date.cmp(&a.date));
        posts
    };

    static ref DOCS: Vec<DocSection> = vec![
        section(
            "Getting Started",
            "Begin building with PORTAL",
            &[
                ("Installation", "/docs/getting-started/installation"),
                ("Quick Start", "/docs/getting-started/quick-start"),
                ("Configuration", "/docs/getting-started/configuration"),
            ],
        ),
        section(
            "Core Concepts",
            "Understand PORTAL fundamentals",
            &[
                ("Type Safety", "/docs/core/type-safety"),
                ("Tools & Functions", "/docs/core/tools"),
                ("Streaming", "/docs/core/streaming"),
                ("Providers", "/docs/core/providers"),
            ],
        ),
        section(
            "API Reference",
            "Complete API documentation",
            &[
                ("PORTAL.ai()", "/docs/api/ai"),
                ("Tool Definition", "/docs/api/tools"),
                ("Message Types", "/docs/api/messages"),
                ("Response Formats", "/docs/api/responses"),
            ],
        ),
        section(
            "Advanced",
            "Master advanced patterns",
            &[
                ("Custom Adapters", "/docs/advanced/adapters"),
                ("Agentic Loops", "/docs/advanced/agents"),
                ("Multimodal", "/docs/advanced/multimodal"),
                ("Performance", "/docs/advanced/performance"),
            ],
        ),
        section(
            "Examples",
            "Real-world implementations",
            &[
                ("Chatbot", "/docs/examples/chatbot"),
                ("Data Analysis", "/docs/examples/analysis"),
                ("Code Generation", "/docs/examples/code-gen"),
                ("Research Agent", "/docs/examples/research"),
            ],
        ),
    ];
}

/// Every post, newest first
pub fn posts() -> &'static [BlogPost] {
    &POSTS
}

pub fn find_post(id: &str) -> Option<&'static BlogPost> {
    POSTS.iter().find(|post| post.id == id)
}

pub fn doc_sections() -> &'static [DocSection] {
    &DOCS
}

fn priority(path: &str) -> &'static str {
    match path {
        "" => "1.0",
        "/blog" => "0.85",
        p if p.starts_with("/blog/") => "0.7",
        _ => "0.8",
    }
}

fn change_frequency(path: &str) -> &'static str {
    if path.starts_with("/blog/") {
        "monthly"
    } else {
        "weekly"
    }
}

/// Render the XML sitemap with every entry stamped `lastmod`
pub fn sitemap(lastmod: NaiveDate) -> String {
    let lastmod = lastmod.format("%Y-%m-%d").to_string();
    let post_paths: Vec<String> = POSTS.iter().map(|p| format!("/blog/{}", p.id)).collect();
    let paths = STATIC_PAGES
        .iter()
        .copied()
        .chain(post_paths.iter().map(String::as_str));

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for path in paths {
        xml.push_str(&format!(
            "  <url>\n    <loc>{}{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{}</changefreq>\n    <priority>{}</priority>\n  </url>\n",
            BASE_URL,
            path,
            lastmod,
            change_frequency(path),
            priority(path),
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}
