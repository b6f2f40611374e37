use askama::Template;
use axum::response::Html;
use kernel::Analysis;

#[derive(Template)]
#[template(path = "index.html")]
struct IndexPage<'a> {
    error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "result.html")]
struct ResultPage<'a> {
    labels: &'a [String],
    output_path: &'a str,
    image_filename: &'a str,
    result_filename: &'a str,
}

/// Upload form, optionally showing why the previous submission failed.
pub fn index(error: Option<&str>) -> Html<String> {
    render(&IndexPage { error })
}

pub fn result(analysis: &Analysis) -> Html<String> {
    render(&ResultPage {
        labels: &analysis.labels,
        output_path: &analysis.output_path,
        image_filename: &analysis.image_filename,
        result_filename: &analysis.result_filename,
    })
}

fn render<T: Template>(page: &T) -> Html<String> {
    match page.render() {
        Ok(html) => Html(html),
        Err(e) => {
            tracing::error!("template rendering failed: {e}");
            Html(String::from("<h1>Internal error</h1>"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, false)]
    #[case(Some("Invalid file type"), true)]
    #[trace]
    fn index_shows_error_only_when_present(#[case] error: Option<&str>, #[case] shown: bool) {
        // Arrange

        // Act
        let Html(html) = index(error);

        // Assert
        assert!(html.contains(r#"name="file""#));
        assert_eq!(html.contains(r#"class="error""#), shown);
    }

    #[test]
    fn index_escapes_error() {
        // Arrange
        let error = "<script>alert(1)</script>";

        // Act
        let Html(html) = index(Some(error));

        // Assert
        assert!(!html.contains(error));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn result_lists_labels_in_order() {
        // Arrange
        let analysis = Analysis {
            labels: vec!["cat".to_owned(), "animal".to_owned(), "pet".to_owned()],
            output_path: "results/analysis_results.json".to_owned(),
            image_filename: "cat.png".to_owned(),
            result_filename: "analysis_results.json".to_owned(),
        };

        // Act
        let Html(html) = result(&analysis);

        // Assert
        let cat = html.find("<li>cat</li>").unwrap();
        let animal = html.find("<li>animal</li>").unwrap();
        let pet = html.find("<li>pet</li>").unwrap();
        assert!(cat < animal && animal < pet);
        assert!(html.contains(r#"src="/uploads/cat.png""#));
        assert!(html.contains(r#"href="/results/analysis_results.json""#));
    }

    #[test]
    fn result_without_labels() {
        // Arrange
        let analysis = Analysis {
            labels: vec![],
            output_path: "results/analysis_results.json".to_owned(),
            image_filename: "blank.gif".to_owned(),
            result_filename: "analysis_results.json".to_owned(),
        };

        // Act
        let Html(html) = result(&analysis);

        // Assert
        assert!(html.contains("No labels detected."));
    }
}
