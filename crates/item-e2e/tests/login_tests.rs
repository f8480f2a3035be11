// Scenario tests for authentication: login success and failure, the redirect
// of unauthenticated visitors, and logout.


use futures::FutureExt;
use harness::{login_first, offline};
use item_e2e::prelude::*;

#[tokio::test]
async fn test_valid_login_shows_item_page() {
    let (_app, session) = offline();
    Session::scoped(session, |s| {
        async move {
            LoginPage::new(s).login("admin", "admin").await?;
            let items = ItemPage::new(s);
            assert!(
                items.is_element_visible(items.add_item_button_locator()).await,
                "add item button never appeared after login"
            );
            assert!(!LoginPage::new(s).is_login_page_displayed().await?);
            Ok(())
        }
        .boxed()
    })
    .await
    .expect("valid login scenario failed");
}

#[tokio::test]
async fn test_wrong_password_shows_error() {
    let (_app, session) = offline();
    Session::scoped(session, |s| {
        async move {
            let login = LoginPage::new(s);
            login.login("admin", "wrongpass").await?;
            assert_eq!(login.error_message().await?, INVALID_CREDENTIALS_ERROR);
            assert!(login.is_login_page_displayed().await?);
            Ok(())
        }
        .boxed()
    })
    .await
    .expect("wrong password scenario failed");
}

#[tokio::test]
async fn test_empty_credentials_show_error() {
    let (_app, session) = offline();
    Session::scoped(session, |s| {
        async move {
            let login = LoginPage::new(s);
            login.login("", "").await?;
            assert_eq!(login.error_message().await?, INVALID_CREDENTIALS_ERROR);
            let items = ItemPage::new(s);
            assert!(!items.is_element_visible(items.add_item_button_locator()).await);
            Ok(())
        }
        .boxed()
    })
    .await
    .expect("empty credentials scenario failed");
}

#[tokio::test]
async fn test_unauthenticated_root_shows_login() {
    let (_app, session) = offline();
    Session::scoped(session, |s| {
        async move {
            s.navigate_root().await?;
            assert!(LoginPage::new(s).is_login_page_displayed().await?);
            Ok(())
        }
        .boxed()
    })
    .await
    .expect("unauthenticated visit scenario failed");
}

#[tokio::test]
async fn test_logout_returns_to_login() {
    let (_app, session) = offline();
    Session::scoped(session, |s| {
        async move {
            login_first(s).await?;
            ItemPage::new(s).logout().await?;

            let login = LoginPage::new(s);
            assert!(login.is_login_page_displayed().await?);

            s.navigate_root().await?;
            assert!(
                login.is_login_page_displayed().await?,
                "item page reachable after logout"
            );
            Ok(())
        }
        .boxed()
    })
    .await
    .expect("logout scenario failed");
}

#[tokio::test]
async fn test_session_closes_when_scenario_fails() {
    let (app, session) = offline();
    let result = Session::scoped(session, |s| {
        async move { LoginPage::new(s).error_message().await }.boxed()
    })
    .await;
    assert!(matches!(result, Err(SuiteError::ElementNotFound { .. })));
    assert!(app.is_closed());
    assert_eq!(app.history().last().map(String::as_str), Some("close"));
}

#[cfg(feature = "browser")]
mod live {
    use super::*;
    use harness::live;

    #[tokio::test]
    #[ignore = "requires the app on localhost:3000 and Chromium"]
    async fn test_live_valid_login() {
        let session = live().await.expect("failed to launch browser");
        Session::scoped(session, |s| {
            async move {
                login_first(s).await?;
                Ok(())
            }
            .boxed()
        })
        .await
        .expect("live login failed");
    }

    #[tokio::test]
    #[ignore = "requires the app on localhost:3000 and Chromium"]
    async fn test_live_wrong_password() {
        let session = live().await.expect("failed to launch browser");
        Session::scoped(session, |s| {
            async move {
                let login = LoginPage::new(s);
                login.login("admin", "wrongpass").await?;
                assert_eq!(login.error_message().await?, INVALID_CREDENTIALS_ERROR);
                Ok(())
            }
            .boxed()
        })
        .await
        .expect("live wrong-password scenario failed");
    }
}
