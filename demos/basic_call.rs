//! Basic example demonstrating declared endpoints.
//!
//! This example shows how to:
//! - Create a client with basic configuration
//! - Declare endpoints once and call them with path parameters
//! - Send a payload dumped through a schema
//! - Stream the items of a listing endpoint
//! - Access the decoded value and raw response
//!
//! Run with: `cargo run --example basic_call`

use apiframe::schema::SerdeSchema;
use apiframe::{Client, Endpoint, Error, Media, PagingConfig};
use futures::{StreamExt, TryStreamExt};
use http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    #[serde(default)]
    id: u32,
    title: String,
    body: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("apiframe=debug,basic_call=info")
        .init();

    // Create a client for the JSONPlaceholder API
    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .build()?;

    let fetch_post = Endpoint::get("/posts/{post_id}");
    let create_post = Endpoint::post("/posts").resp_codes([StatusCode::CREATED]);
    let list_posts = Endpoint::get("/posts").paged(PagingConfig::new(10));
    let schema = SerdeSchema::<Post>::new();

    println!("=== GET Request Example ===");
    let mut req = client.request(&fetch_post);
    req.path_param("post_id", 1);
    let info = req.execute_with(&schema).await?;

    println!("Request latency: {:?}", info.latency);
    println!("Status code: {}", info.status());
    let post = info.require_loaded()?;
    println!("Post ID: {}", post.id);
    println!("Title: {}", post.title);
    println!();

    println!("=== POST Request Example ===");
    let new_post = Post {
        user_id: 1,
        id: 0,
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
    };

    let mut req = client.request(&create_post);
    req.media = Media::dump(&SerdeSchema::<Post>::new().exclude(["id"]), &new_post)?;
    let info = req.execute_with(&schema).await?;

    println!("Content-Type: {:?}", info.header("content-type"));
    println!("Raw response length: {} bytes", info.resp.body.len());
    if let Some(created) = info.loaded {
        println!("Created post ID: {}", created.id);
    }
    println!();

    println!("=== Paged Listing Example ===");
    let titles: Vec<String> = client
        .request(&list_posts)
        .paged(SerdeSchema::<Post>::new())
        .take(5)
        .map_ok(|item| item.loaded.title)
        .try_collect()
        .await?;

    for title in titles {
        println!("- {}", title);
    }

    Ok(())
}
