use axum::response::Html;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Welcome page HTML", content_type = "text/html")
    ),
    tag = "General"
)]
pub async fn root() -> Html<&'static str> {
    Html(r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title>Article Photo Kit</title>
            <style>
                body {
                    display: flex;
                    flex-direction: column;
                    justify-content: center;
                    align-items: center;
                    height: 100vh;
                    margin: 0;
                    font-family: Arial, sans-serif;
                }
            </style>
        </head>
        <body>
            <h1>Article Photo Kit</h1>
            <p>POST a JPEG or PNG to <code>/api/article/{id}/uploadPhoto</code>.</p>
            <a href="/swagger-ui/">API docs</a>
        </body>
        </html>
    "#)
}
